//! seating.rs
//!
//! Схема зала: 16 мест, битовая карта выбранных мест в ключе `seats`.
//!
//! Переключение места - это read-modify-write, поэтому оно идёт через
//! оптимистичный цикл compare-and-swap: читаем сырое значение, считаем новую
//! карту и проверяем лимит на этом же снимке, записываем только если значение
//! не изменилось. Наивные GET + SET под конкурентной нагрузкой теряли бы
//! чужие переключения.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::models::{SeatIndex, SeatMap};
use crate::store::{KeyValueStore, StoreError};

pub const SEATS_KEY: &str = "seats";

/// Карта вместе с сырым значением ключа, из которого она прочитана.
/// Сырое значение нужно для условной записи поверх этого снимка.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapSnapshot {
    pub raw: Option<String>,
    pub map: SeatMap,
}

#[derive(Clone)]
pub struct SeatMapManager {
    store: Arc<dyn KeyValueStore>,
    max_attempts: u32,
}

impl SeatMapManager {
    pub fn new(store: Arc<dyn KeyValueStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Сколько раз условная запись перечитывает карту при конфликте.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Текущая карта. Отсутствующий ключ - пустая карта.
    pub async fn get_map(&self) -> Result<SeatMap, AppError> {
        Ok(self.snapshot().await?.map)
    }

    pub async fn snapshot(&self) -> Result<MapSnapshot, AppError> {
        let raw = self.store.get(SEATS_KEY).await?;
        let map = decode(raw.as_deref())?;
        Ok(MapSnapshot { raw, map })
    }

    pub async fn toggle_seat(&self, index: SeatIndex) -> Result<SeatMap, AppError> {
        for attempt in 1..=self.max_attempts {
            let MapSnapshot { raw, map: current } = self.snapshot().await?;

            let next = match current.toggle(index) {
                Ok(next) => next,
                Err(e) => {
                    warn!(
                        "Seat {} rejected: {} seats already selected",
                        index.get(),
                        current.selected_count()
                    );
                    return Err(e);
                }
            };

            if self
                .store
                .compare_and_swap(SEATS_KEY, raw.as_deref(), &next.encode())
                .await?
            {
                info!("Seat {} toggled, map is now {}", index.get(), next.encode());
                return Ok(next);
            }

            debug!("Seat map changed under toggle of seat {} (attempt {})", index.get(), attempt);
            tokio::task::yield_now().await;
        }

        Err(StoreError::Contention {
            key: SEATS_KEY.to_string(),
            attempts: self.max_attempts,
        }
        .into())
    }

    pub async fn reset_map(&self) -> Result<(), AppError> {
        self.store.set(SEATS_KEY, &SeatMap::EMPTY.encode()).await?;
        info!("Seat map reset");
        Ok(())
    }
}

fn decode(raw: Option<&str>) -> Result<SeatMap, StoreError> {
    match raw {
        None => Ok(SeatMap::EMPTY),
        Some(value) => SeatMap::decode(value).ok_or_else(|| StoreError::Corrupt {
            key: SEATS_KEY.to_string(),
            value: value.to_string(),
        }),
    }
}
