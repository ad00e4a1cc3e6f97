pub mod cache;
pub mod config;
pub mod controllers;
pub mod error;
pub mod models;
pub mod redis_client;
pub mod services;
pub mod store;

use anyhow::Context;
use axum::{extract::State, routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::{Config, StoreBackend};
use crate::error::AppError;
use crate::services::{
    cart::CartManager, circuit_breaker::CircuitBreaker, monitor::CommandFeed,
    reservations::Reservations, seating::SeatMapManager, weather::WeatherClient,
};
use crate::store::{KeyValueStore, MemoryStore, MonitoredStore};

// Сколько команд монитор держит для медленного подписчика
const MONITOR_BUFFER: usize = 1024;

// Shared state для всего приложения
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn KeyValueStore>,
    pub reservations: Reservations,
    pub cache: cache::CacheService,
    pub monitor: CommandFeed,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let store: Arc<dyn KeyValueStore> = match config.redis.backend {
            StoreBackend::Redis => {
                let redis = redis_client::RedisStore::new(&config.redis.url)
                    .await
                    .with_context(|| format!("Failed to connect to Redis at {}", config.redis.url))?;
                info!("Redis connected");
                Arc::new(redis)
            }
            StoreBackend::Memory => {
                warn!("Using in-memory store, state is not shared between instances");
                Arc::new(MemoryStore::new())
            }
        };
        Self::from_store(config, store)
    }

    /// Собирает состояние поверх готового хранилища. Все команды к нему
    /// проходят через монитор.
    pub fn from_store(config: Config, store: Arc<dyn KeyValueStore>) -> anyhow::Result<Arc<Self>> {
        let monitor = CommandFeed::new(MONITOR_BUFFER);
        let store: Arc<dyn KeyValueStore> = Arc::new(MonitoredStore::new(store, monitor.clone()));

        let circuit_breaker = Arc::new(CircuitBreaker::new(
            config.circuit_breaker.failure_threshold,
            config.circuit_breaker.timeout_seconds,
        ));
        let weather = WeatherClient::from_config(&config.weather, circuit_breaker)
            .context("Failed to create weather HTTP client")?;

        let reservations = Reservations::new(
            SeatMapManager::new(store.clone(), config.seating.cas_max_attempts),
            CartManager::new(store.clone()),
        );
        let cache = cache::CacheService::new(store.clone(), weather, config.weather.cache_ttl_seconds);

        Ok(Arc::new(Self {
            config,
            store,
            reservations,
            cache,
            monitor,
        }))
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Result<&'static str, AppError> {
    state.store.ping().await?;
    Ok("OK")
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Seat Showcase API v1.0" }))
        .route("/health", get(health))
        .merge(controllers::routes())
        .with_state(state)
        // Браузерный клиент живёт на другом origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
