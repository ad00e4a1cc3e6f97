use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use super::MessageResponse;
use crate::error::AppError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/weather", get(get_weather))
        .route("/cache", delete(clear_cache))
}

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub city: Option<String>,
    /// `true` - мимо кеша, прямо во внешний API.
    pub source: Option<bool>,
}

// GET /weather?city=&source=
async fn get_weather(
    State(state): State<Arc<AppState>>,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = query?;
    let city = params
        .city
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| state.config.weather.default_city.clone());

    let report = state
        .cache
        .weather(&city, params.source.unwrap_or(false))
        .await?;

    Ok((
        [("X-Cache", report.status.as_header())],
        Json(report.body),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CacheQuery {
    pub city: String,
}

// DELETE /cache?city=
async fn clear_cache(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CacheQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Query(params) = query?;
    if !state.cache.clear_weather(&params.city).await? {
        return Err(AppError::NotFound(format!("No cache found for {}", params.city)));
    }
    Ok(Json(MessageResponse::new(format!("Cache for {} cleared", params.city))))
}
