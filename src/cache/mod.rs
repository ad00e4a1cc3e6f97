//! Простые структуры Redis поверх общего хранилища: счётчик, таблица лидеров
//! и кеш ответов внешнего API погоды.

use std::sync::Arc;

use crate::services::weather::WeatherClient;
use crate::store::KeyValueStore;

pub mod counter;
pub mod leaderboard;
pub mod weather;

pub use leaderboard::RankedElement;
pub use weather::{CacheStatus, WeatherReport};

#[derive(Clone)]
pub struct CacheService {
    store: Arc<dyn KeyValueStore>,
    weather: WeatherClient,
    weather_ttl: u64,
}

impl CacheService {
    pub fn new(store: Arc<dyn KeyValueStore>, weather: WeatherClient, weather_ttl: u64) -> Self {
        Self {
            store,
            weather,
            weather_ttl,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::WeatherConfig;
    use crate::services::circuit_breaker::CircuitBreaker;
    use crate::store::MemoryStore;

    /// Кеш поверх памяти; API погоды по адресу `base_url`.
    pub fn cache_with(base_url: &str) -> (CacheService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let config = WeatherConfig {
            api_key: "test-key".to_string(),
            base_url: base_url.to_string(),
            ..WeatherConfig::default()
        };
        let weather =
            WeatherClient::from_config(&config, Arc::new(CircuitBreaker::new(5, 60))).unwrap();
        (
            CacheService::new(store.clone(), weather, config.cache_ttl_seconds),
            store,
        )
    }

    pub fn cache() -> (CacheService, Arc<MemoryStore>) {
        cache_with("http://127.0.0.1:9")
    }
}
