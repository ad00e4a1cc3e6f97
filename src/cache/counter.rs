use tracing::info;

use crate::cache::CacheService;
use crate::error::AppError;
use crate::store::StoreError;

pub const COUNTER_KEY: &str = "counter";

impl CacheService {
    // Отсутствующий ключ - ноль
    pub async fn counter(&self) -> Result<i64, AppError> {
        match self.store.get(COUNTER_KEY).await? {
            None => Ok(0),
            Some(raw) => raw.trim().parse().map_err(|_| {
                AppError::from(StoreError::Corrupt {
                    key: COUNTER_KEY.to_string(),
                    value: raw,
                })
            }),
        }
    }

    pub async fn increment(&self) -> Result<i64, AppError> {
        Ok(self.store.incr_by(COUNTER_KEY, 1).await?)
    }

    pub async fn decrement(&self) -> Result<i64, AppError> {
        Ok(self.store.incr_by(COUNTER_KEY, -1).await?)
    }

    pub async fn set_counter(&self, value: i64) -> Result<i64, AppError> {
        self.store.set(COUNTER_KEY, &value.to_string()).await?;
        info!("Counter set to {}", value);
        Ok(value)
    }
}
