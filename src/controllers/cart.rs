use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::MessageResponse;
use crate::error::AppError;
use crate::models::{Cart, SeatId, SeatIndex};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/fetchCartItems", get(fetch_cart_items))
        .route("/AddToCart", post(add_to_cart))
        .route("/removeFromCart", post(remove_from_cart))
        .route("/emptyCart", post(empty_cart))
}

// GET /fetchCartItems
async fn fetch_cart_items(State(state): State<Arc<AppState>>) -> Result<Json<Cart>, AppError> {
    Ok(Json(state.reservations.cart.get_cart().await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct AddToCartRequest {
    /// Индексы мест; без них в корзину идут все выбранные места.
    pub seats: Option<Vec<i64>>,
}

#[derive(Debug, Serialize)]
pub struct AddToCartResponse {
    pub message: String,
    pub added: usize,
    pub cart: Cart,
}

// POST /AddToCart - тело необязательно
async fn add_to_cart(
    State(state): State<Arc<AppState>>,
    body: Result<Option<Json<AddToCartRequest>>, JsonRejection>,
) -> Result<Json<AddToCartResponse>, AppError> {
    let req = body?.map(|Json(req)| req).unwrap_or_default();
    let requested = req
        .seats
        .map(|seats| {
            seats
                .into_iter()
                .map(SeatIndex::new)
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    let (addition, cart) = state.reservations.promote(requested.as_deref()).await?;
    Ok(Json(AddToCartResponse {
        message: "Added to cart successfully.".to_string(),
        added: addition.added,
        cart,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    pub seat: String,
}

// POST /removeFromCart
async fn remove_from_cart(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RemoveFromCartRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(req) = body?;
    let seat: SeatId = req.seat.parse()?;
    state.reservations.cart.remove(seat).await?;
    Ok(Json(MessageResponse::new("Removed from cart successfully.")))
}

// POST /emptyCart
async fn empty_cart(State(state): State<Arc<AppState>>) -> Result<Json<MessageResponse>, AppError> {
    state.reservations.cart.clear().await?;
    Ok(Json(MessageResponse::new("Cart emptied successfully.")))
}
