use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, Capacity, CapacityScope};
use crate::models::cart::Cart;

/// Количество мест в зале.
pub const SEAT_COUNT: u8 = 16;
/// Сколько мест можно держать выбранными одновременно.
pub const SELECTION_LIMIT: usize = 8;

/// Индекс места на схеме, всегда в диапазоне 0..16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeatIndex(u8);

impl SeatIndex {
    pub fn new(raw: i64) -> Result<Self, AppError> {
        if (0..i64::from(SEAT_COUNT)).contains(&raw) {
            Ok(SeatIndex(raw as u8))
        } else {
            Err(AppError::InvalidInput(format!(
                "seat index {} is out of range 0..={}",
                raw,
                SEAT_COUNT - 1
            )))
        }
    }

    pub fn all() -> impl Iterator<Item = SeatIndex> {
        (0..SEAT_COUNT).map(SeatIndex)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    fn mask(self) -> u16 {
        1 << self.0
    }

    pub fn seat_id(self) -> SeatId {
        SeatId(self)
    }
}

/// Идентификатор места в корзине: `seat{N}`, нумерация с единицы.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeatId(SeatIndex);

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seat{}", u16::from(self.0.get()) + 1)
    }
}

impl FromStr for SeatId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::InvalidInput(format!("unknown seat id `{}`", s));
        let number: i64 = s
            .strip_prefix("seat")
            .filter(|n| !n.starts_with('+') && !n.starts_with('0'))
            .and_then(|n| n.parse().ok())
            .ok_or_else(invalid)?;
        SeatIndex::new(number - 1).map(SeatId).map_err(|_| invalid())
    }
}

impl Serialize for SeatId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Битовая карта выбранных мест: бит i = место i выбрано.
///
/// В хранилище лежит строкой из 16 символов `0`/`1`, старший бит слева,
/// то есть место 0 - последний символ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeatMap(u16);

impl SeatMap {
    pub const EMPTY: SeatMap = SeatMap(0);

    pub fn from_bits(bits: u16) -> Self {
        SeatMap(bits)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn is_selected(self, index: SeatIndex) -> bool {
        self.0 & index.mask() != 0
    }

    pub fn selected_count(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn selected(self) -> impl Iterator<Item = SeatIndex> {
        SeatIndex::all().filter(move |i| self.is_selected(*i))
    }

    /// Переключает место. Лимит проверяется по состоянию ПОСЛЕ переключения,
    /// поэтому снятие выбора проходит всегда.
    pub fn toggle(self, index: SeatIndex) -> Result<SeatMap, AppError> {
        let next = SeatMap(self.0 ^ index.mask());
        if next.selected_count() > SELECTION_LIMIT {
            return Err(AppError::CapacityExceeded(Capacity {
                scope: CapacityScope::Selection,
                current: self.selected_count(),
                attempted: 1,
                limit: SELECTION_LIMIT,
            }));
        }
        Ok(next)
    }

    pub fn encode(self) -> String {
        format!("{:016b}", self.0)
    }

    /// Разбирает значение из хранилища. `None`, если строка не похожа на карту.
    pub fn decode(raw: &str) -> Option<SeatMap> {
        let raw = raw.trim();
        if raw.is_empty()
            || raw.len() > usize::from(SEAT_COUNT)
            || !raw.bytes().all(|b| b == b'0' || b == b'1')
        {
            return None;
        }
        u16::from_str_radix(raw, 2).ok().map(SeatMap)
    }
}

/// Состояние конкретного места: свободно, выбрано или уже в корзине.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatState {
    Free,
    Selected,
    InCart,
}

/// Результат перевода места в корзину.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Promotion {
    New,
    AlreadyInCart,
}

impl SeatState {
    /// Корзина важнее выбора: место в корзине показываем как IN_CART,
    /// даже если с него уже сняли выделение.
    pub fn resolve(selected: bool, in_cart: bool) -> Self {
        match (selected, in_cart) {
            (_, true) => SeatState::InCart,
            (true, false) => SeatState::Selected,
            (false, false) => SeatState::Free,
        }
    }

    /// Selected -> InCart. Повторный перевод места из корзины ничего не меняет.
    pub fn promote(self, index: SeatIndex) -> Result<Promotion, AppError> {
        match self {
            SeatState::Selected => Ok(Promotion::New),
            SeatState::InCart => Ok(Promotion::AlreadyInCart),
            SeatState::Free => Err(AppError::InvalidInput(format!(
                "{} is not selected",
                index.seat_id()
            ))),
        }
    }
}

/// Снимок схемы зала вместе с корзиной.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeatBoard {
    pub map: SeatMap,
    pub cart: Cart,
}

impl SeatBoard {
    pub fn new(map: SeatMap, cart: Cart) -> Self {
        Self { map, cart }
    }

    pub fn state(&self, index: SeatIndex) -> SeatState {
        SeatState::resolve(self.map.is_selected(index), self.cart.contains(index.seat_id()))
    }

    pub fn states(&self) -> Vec<SeatState> {
        SeatIndex::all().map(|i| self.state(i)).collect()
    }

    /// Какие места отправить в корзину.
    ///
    /// Без явного списка берутся все выбранные места. Явный список может
    /// содержать только выбранные места или места, которые уже в корзине.
    pub fn promotion_candidates(
        &self,
        requested: Option<&[SeatIndex]>,
    ) -> Result<Vec<(SeatId, Promotion)>, AppError> {
        let indices: Vec<SeatIndex> = match requested {
            Some(list) => list.to_vec(),
            None => self.map.selected().collect(),
        };

        let mut candidates = Vec::with_capacity(indices.len());
        for index in indices {
            let promotion = self.state(index).promote(index)?;
            candidates.push((index.seat_id(), promotion));
        }
        candidates.sort();
        candidates.dedup();
        Ok(candidates)
    }
}
