//! reservations.rs
//!
//! Связка схемы зала и корзины: Free -> Selected -> InCart.
//!
//! Схема и корзина - два независимых автомата, сверяются они только в момент
//! перевода мест в корзину. Брать в корзину можно лишь места, выбранные на
//! схеме. Запись в корзину условна: она проходит, только если ключ схемы
//! всё ещё хранит прочитанный снимок, иначе снимок перечитывается.

use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::error::AppError;
use crate::models::{Cart, Promotion, SeatBoard, SeatIndex};
use crate::services::cart::{CartAddition, CartManager};
use crate::services::seating::{MapSnapshot, SeatMapManager, SEATS_KEY};
use crate::store::{Precondition, StoreError};

#[derive(Clone)]
pub struct Reservations {
    pub seats: SeatMapManager,
    pub cart: CartManager,
}

impl Reservations {
    pub fn new(seats: SeatMapManager, cart: CartManager) -> Self {
        Self { seats, cart }
    }

    /// Схема и корзина, прочитанные параллельно.
    pub async fn board(&self) -> Result<SeatBoard, AppError> {
        let (map, cart) = tokio::try_join!(self.seats.get_map(), self.cart.get_cart())?;
        Ok(SeatBoard::new(map, cart))
    }

    /// Переводит места в корзину: все выбранные, если `requested` пуст,
    /// иначе только перечисленные (каждое должно быть выбрано).
    pub async fn promote(
        &self,
        requested: Option<&[SeatIndex]>,
    ) -> Result<(CartAddition, Cart), AppError> {
        let max_attempts = self.seats.max_attempts();
        for attempt in 1..=max_attempts {
            let (snapshot, cart) =
                tokio::try_join!(self.seats.snapshot(), self.cart.get_cart())?;
            let MapSnapshot { raw, map } = snapshot;

            let candidates = SeatBoard::new(map, cart).promotion_candidates(requested)?;
            if candidates.is_empty() {
                return Err(AppError::InvalidInput("No seats selected.".to_string()));
            }

            let already = candidates
                .iter()
                .filter(|(_, p)| *p == Promotion::AlreadyInCart)
                .count();
            let ids: BTreeSet<_> = candidates.into_iter().map(|(id, _)| id).collect();

            let unchanged = Precondition {
                key: SEATS_KEY,
                expected: raw.as_deref(),
            };
            if let Some(addition) = self.cart.add_selected(&ids, Some(unchanged)).await? {
                info!("Promoted {} seats ({} already in cart)", ids.len(), already);
                let cart = self.cart.get_cart().await?;
                return Ok((addition, cart));
            }

            debug!("Seat map changed under promotion (attempt {})", attempt);
            tokio::task::yield_now().await;
        }

        Err(StoreError::Contention {
            key: SEATS_KEY.to_string(),
            attempts: max_attempts,
        }
        .into())
    }
}
