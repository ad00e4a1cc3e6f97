use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::seat::SeatId;
use crate::store::StoreError;

/// Сколько мест может лежать в корзине одновременно.
pub const CART_LIMIT: usize = 4;
/// Цена одного места, одинаковая для всего зала.
pub const SEAT_PRICE: u32 = 5;

/// Содержимое корзины: `seat{N}` -> цена.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Cart {
    entries: BTreeMap<SeatId, u32>,
}

impl Cart {
    /// Собирает корзину из полей хеша. Чужие поля и нечисловые цены
    /// считаются порчей данных.
    pub fn from_fields(key: &str, fields: BTreeMap<String, String>) -> Result<Cart, StoreError> {
        let mut entries = BTreeMap::new();
        for (field, value) in fields {
            let corrupt = || StoreError::Corrupt {
                key: key.to_string(),
                value: format!("{}={}", field, value),
            };
            let seat: SeatId = field.parse().map_err(|_| corrupt())?;
            let price: u32 = value.trim().parse().map_err(|_| corrupt())?;
            entries.insert(seat, price);
        }
        Ok(Cart { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, seat: SeatId) -> bool {
        self.entries.contains_key(&seat)
    }

    pub fn price(&self, seat: SeatId) -> Option<u32> {
        self.entries.get(&seat).copied()
    }

    pub fn total(&self) -> u32 {
        self.entries.values().sum()
    }
}
