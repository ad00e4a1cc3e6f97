pub mod cart;
pub mod counter;
pub mod leaderboard;
pub mod monitor;
pub mod seating;
pub mod weather;

use axum::Router;
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(seating::routes())
        .merge(cart::routes())
        .merge(counter::routes())
        .merge(leaderboard::routes())
        .merge(weather::routes())
        .merge(monitor::routes())
}

/// Ответ `{"message": ...}` для операций без собственного результата.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
