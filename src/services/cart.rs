//! cart.rs
//!
//! Корзина: хеш `cart`, поля `seat{N}` со значением цены места.
//!
//! Перевод мест в корзину - одна атомарная операция хранилища: подсчёт новых
//! мест, проверка лимита и запись всех полей. Либо добавлены все новые места,
//! либо ни одного.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{AppError, Capacity, CapacityScope};
use crate::models::cart::{CART_LIMIT, SEAT_PRICE};
use crate::models::{Cart, SeatId};
use crate::store::{CappedInsert, KeyValueStore, Precondition};

pub const CART_KEY: &str = "cart";

/// Итог перевода мест в корзину.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartAddition {
    /// Сколько мест реально добавлено (без тех, что уже были в корзине).
    pub added: usize,
    /// Размер корзины после операции.
    pub cart_size: usize,
}

#[derive(Clone)]
pub struct CartManager {
    store: Arc<dyn KeyValueStore>,
}

impl CartManager {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn get_cart(&self) -> Result<Cart, AppError> {
        let fields = self.store.hash_get_all(CART_KEY).await?;
        Ok(Cart::from_fields(CART_KEY, fields)?)
    }

    /// Добавляет выбранные места. Места, уже лежащие в корзине, не
    /// учитываются в лимите и не перезаписываются, так что повтор запроса
    /// безопасен.
    ///
    /// `Ok(None)` - `precondition` не выполнилось к моменту записи,
    /// корзина не изменилась.
    pub async fn add_selected(
        &self,
        selected: &BTreeSet<SeatId>,
        precondition: Option<Precondition<'_>>,
    ) -> Result<Option<CartAddition>, AppError> {
        if selected.is_empty() {
            return Err(AppError::InvalidInput("No seats selected.".to_string()));
        }

        let fields: Vec<String> = selected.iter().map(ToString::to_string).collect();
        let outcome = self
            .store
            .hash_insert_capped(
                CART_KEY,
                &fields,
                &SEAT_PRICE.to_string(),
                CART_LIMIT,
                precondition,
            )
            .await?;

        match outcome {
            CappedInsert::Inserted { added, size } => {
                info!("Added {} seats to cart, cart size is now {}", added, size);
                Ok(Some(CartAddition { added, cart_size: size }))
            }
            CappedInsert::Stale => Ok(None),
            CappedInsert::Rejected { current, attempted } => {
                warn!(
                    "Cart limit exceeded: {} in cart, tried to add {} more",
                    current, attempted
                );
                Err(AppError::CapacityExceeded(Capacity {
                    scope: CapacityScope::Cart,
                    current,
                    attempted,
                    limit: CART_LIMIT,
                }))
            }
        }
    }

    pub async fn remove(&self, seat: SeatId) -> Result<(), AppError> {
        if !self.store.hash_delete(CART_KEY, &seat.to_string()).await? {
            return Err(AppError::NotFound("Seat not found in cart.".to_string()));
        }
        info!("Removed {} from cart", seat);
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), AppError> {
        self.store.delete(CART_KEY).await?;
        info!("Cart emptied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SeatIndex;
    use crate::store::MemoryStore;

    fn manager() -> (CartManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (CartManager::new(store.clone()), store)
    }

    fn ids(indices: &[i64]) -> BTreeSet<SeatId> {
        indices
            .iter()
            .map(|i| SeatIndex::new(*i).unwrap().seat_id())
            .collect()
    }

    fn seat(id: &str) -> SeatId {
        id.parse().unwrap()
    }

    #[tokio::test]
    async fn add_remove_walkthrough() {
        let (cart, _) = manager();
        let added = cart.add_selected(&ids(&[0]), None).await.unwrap();
        assert_eq!(added, Some(CartAddition { added: 1, cart_size: 1 }));

        let contents = cart.get_cart().await.unwrap();
        assert_eq!(serde_json::to_string(&contents).unwrap(), r#"{"seat1":5}"#);

        cart.remove(seat("seat1")).await.unwrap();
        assert!(cart.get_cart().await.unwrap().is_empty());

        assert!(matches!(
            cart.remove(seat("seat1")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn over_cap_promotion_changes_nothing() {
        let (cart, store) = manager();
        cart.add_selected(&ids(&[0, 1, 2]), None).await.unwrap();
        let before = store.hash_get_all(CART_KEY).await.unwrap();

        let err = cart.add_selected(&ids(&[3, 4]), None).await.unwrap_err();
        match err {
            AppError::CapacityExceeded(c) => {
                assert_eq!(c.scope, CapacityScope::Cart);
                assert_eq!((c.current, c.attempted, c.limit), (3, 2, 4));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.hash_get_all(CART_KEY).await.unwrap(), before);
    }

    #[tokio::test]
    async fn seats_already_in_cart_do_not_count() {
        let (cart, _) = manager();
        cart.add_selected(&ids(&[0, 1, 2]), None).await.unwrap();

        let added = cart.add_selected(&ids(&[0, 1, 2, 3]), None).await.unwrap();
        assert_eq!(added, Some(CartAddition { added: 1, cart_size: 4 }));

        // повтор - не ошибка и ничего не меняет
        let again = cart.add_selected(&ids(&[0, 1, 2, 3]), None).await.unwrap();
        assert_eq!(again, Some(CartAddition { added: 0, cart_size: 4 }));
        assert_eq!(cart.get_cart().await.unwrap().total(), 20);
    }

    #[tokio::test]
    async fn existing_price_entries_are_left_alone() {
        let (cart, store) = manager();
        store
            .hash_insert_capped(CART_KEY, &["seat1".to_string()], "3", 4, None)
            .await
            .unwrap();
        cart.add_selected(&ids(&[0, 1]), None).await.unwrap();

        let contents = cart.get_cart().await.unwrap();
        assert_eq!(contents.price(seat("seat1")), Some(3));
        assert_eq!(contents.price(seat("seat2")), Some(SEAT_PRICE));
    }

    #[tokio::test]
    async fn empty_selection_is_invalid() {
        let (cart, _) = manager();
        assert!(matches!(
            cart.add_selected(&BTreeSet::new(), None).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn clear_is_unconditional() {
        let (cart, _) = manager();
        cart.clear().await.unwrap();
        cart.add_selected(&ids(&[7, 8]), None).await.unwrap();
        cart.clear().await.unwrap();
        assert!(cart.get_cart().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_promotions_never_overfill() {
        let (cart, _) = manager();
        let handles: Vec<_> = (0..6)
            .map(|i| {
                let cart = cart.clone();
                tokio::spawn(async move { cart.add_selected(&ids(&[2 * i, 2 * i + 1]), None).await })
            })
            .collect();

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                wins += 1;
            }
        }
        assert_eq!(wins, 2);
        assert_eq!(cart.get_cart().await.unwrap().len(), 4);
    }
}
