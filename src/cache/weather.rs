use serde_json::Value;
use tracing::{info, warn};

use crate::cache::CacheService;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_header(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeatherReport {
    pub body: Value,
    pub status: CacheStatus,
}

fn weather_key(city: &str) -> String {
    format!("weather:{}", city.trim().to_lowercase())
}

impl CacheService {
    /// Cache-through: сначала кеш, при промахе - внешний API и запись в кеш
    /// с TTL. `bypass_cache` всегда идёт во внешний API и обновляет кеш.
    pub async fn weather(&self, city: &str, bypass_cache: bool) -> Result<WeatherReport, AppError> {
        let key = weather_key(city);

        if !bypass_cache {
            if let Some(cached) = self.store.get(&key).await? {
                match serde_json::from_str(&cached) {
                    Ok(body) => {
                        info!("Serving weather for {} from cache", city);
                        return Ok(WeatherReport {
                            body,
                            status: CacheStatus::Hit,
                        });
                    }
                    // битую запись просто перезапишем
                    Err(e) => warn!("Dropping unreadable cache entry {}: {}", key, e),
                }
            }
        }

        let body = self.weather.fetch(city).await?;
        self.store
            .set_ex(&key, &body.to_string(), self.weather_ttl)
            .await?;
        info!("Weather for {} cached for {}s", city, self.weather_ttl);

        Ok(WeatherReport {
            body,
            status: CacheStatus::Miss,
        })
    }

    /// `true`, если в кеше что-то было.
    pub async fn clear_weather(&self, city: &str) -> Result<bool, AppError> {
        let removed = self.store.delete(&weather_key(city)).await?;
        if removed {
            info!("Cache for {} cleared", city);
        }
        Ok(removed)
    }
}
