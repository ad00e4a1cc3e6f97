use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::MessageResponse;
use crate::error::AppError;
use crate::models::{SeatIndex, SeatMap, SeatState};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/seating", get(get_seating))
        .route("/setSeat", post(set_seat))
        .route("/emptySelection", post(empty_selection))
}

#[derive(Debug, Serialize)]
pub struct SeatMapResponse {
    /// Битовая карта числом: бит i - место i.
    pub bitmap: u16,
    /// Та же карта в том виде, в каком она лежит в хранилище.
    pub bits: String,
    pub selected: usize,
}

impl From<SeatMap> for SeatMapResponse {
    fn from(map: SeatMap) -> Self {
        Self {
            bitmap: map.bits(),
            bits: map.encode(),
            selected: map.selected_count(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SeatingResponse {
    #[serde(flatten)]
    pub map: SeatMapResponse,
    pub seats: Vec<SeatState>,
}

// GET /seating
async fn get_seating(State(state): State<Arc<AppState>>) -> Result<Json<SeatingResponse>, AppError> {
    let board = state.reservations.board().await?;
    Ok(Json(SeatingResponse {
        map: board.map.into(),
        seats: board.states(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSeatRequest {
    pub seat_index: i64,
}

// POST /setSeat
async fn set_seat(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SetSeatRequest>, JsonRejection>,
) -> Result<Json<SeatMapResponse>, AppError> {
    let Json(req) = body?;
    let index = SeatIndex::new(req.seat_index)?;
    let map = state.reservations.seats.toggle_seat(index).await?;
    Ok(Json(map.into()))
}

// POST /emptySelection
async fn empty_selection(State(state): State<Arc<AppState>>) -> Result<Json<MessageResponse>, AppError> {
    state.reservations.seats.reset_map().await?;
    Ok(Json(MessageResponse::new("Seats reset successfully")))
}
