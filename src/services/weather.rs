//! weather.rs
//!
//! Клиент внешнего API погоды (OpenWeather-совместимый `GET {base}/weather?q=&appid=`).
//! Все сетевые вызовы идут через `CircuitBreaker`; сбоями считаются только
//! ошибки транспорта и 5xx, "город не найден" выключатель не размыкает.

use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::config::WeatherConfig;
use crate::error::AppError;
use crate::services::circuit_breaker::CircuitBreaker;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("circuit breaker is open - weather API temporarily unavailable")]
    CircuitOpen,

    #[error("city `{0}` not found")]
    CityNotFound(String),

    #[error("weather API answered {0}")]
    Status(StatusCode),

    #[error("weather API request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::CityNotFound(city) => AppError::NotFound(format!("City {} not found", city)),
            _ => AppError::Upstream("Failed to fetch weather data".to_string()),
        }
    }
}

#[derive(Clone)]
pub struct WeatherClient {
    api_key: String,
    base_url: String,
    http_client: reqwest::Client,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl WeatherClient {
    pub fn from_config(
        config: &WeatherConfig,
        circuit_breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client,
            circuit_breaker,
        })
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    /// Текущая погода по городу, тело ответа как есть.
    pub async fn fetch(&self, city: &str) -> Result<Value, WeatherError> {
        if !self.circuit_breaker.can_execute() {
            warn!("Circuit breaker is OPEN - blocking weather request for {}", city);
            return Err(WeatherError::CircuitOpen);
        }

        debug!("Fetching weather for {} from upstream", city);
        match self.request(city).await {
            Ok(body) => {
                self.circuit_breaker.record_success();
                Ok(body)
            }
            Err(WeatherError::CityNotFound(city)) => {
                // сервис ответил, значит он жив
                self.circuit_breaker.record_success();
                Err(WeatherError::CityNotFound(city))
            }
            Err(e) => {
                error!("Weather request for {} failed: {}", city, e);
                self.circuit_breaker.record_failure();
                Err(e)
            }
        }
    }

    async fn request(&self, city: &str) -> Result<Value, WeatherError> {
        let response = self
            .http_client
            .get(format!("{}/weather", self.base_url))
            .query(&[("q", city), ("appid", self.api_key.as_str())])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(WeatherError::CityNotFound(city.to_string())),
            status if !status.is_success() => Err(WeatherError::Status(status)),
            _ => Ok(response.json().await?),
        }
    }
}
