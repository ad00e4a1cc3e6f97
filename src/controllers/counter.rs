use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AppError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/counter", get(get_counter))
        .route("/increment", post(increment))
        .route("/decrement", post(decrement))
        .route("/setCounter", post(set_counter))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CounterValue {
    pub value: i64,
}

async fn get_counter(State(state): State<Arc<AppState>>) -> Result<Json<CounterValue>, AppError> {
    let value = state.cache.counter().await?;
    Ok(Json(CounterValue { value }))
}

async fn increment(State(state): State<Arc<AppState>>) -> Result<Json<CounterValue>, AppError> {
    let value = state.cache.increment().await?;
    Ok(Json(CounterValue { value }))
}

async fn decrement(State(state): State<Arc<AppState>>) -> Result<Json<CounterValue>, AppError> {
    let value = state.cache.decrement().await?;
    Ok(Json(CounterValue { value }))
}

async fn set_counter(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CounterValue>, JsonRejection>,
) -> Result<Json<CounterValue>, AppError> {
    let Json(req) = body?;
    let value = state.cache.set_counter(req.value).await?;
    Ok(Json(CounterValue { value }))
}
