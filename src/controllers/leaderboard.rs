use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::MessageResponse;
use crate::cache::RankedElement;
use crate::error::AppError;
use crate::store::RangeOrder;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/addElement", post(add_element))
        .route("/updateScore", put(update_score))
        .route("/getAllElements", get(get_all_elements))
        .route("/getRankedElements", get(get_ranked_elements))
        .route("/getRanking", get(get_ranked_elements))
        .route("/deleteElement", delete(delete_element))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddElementRequest {
    #[validate(length(min = 1, max = 256))]
    pub element: String,
    pub score: f64,
}

#[derive(Debug, Serialize)]
struct AddedResponse {
    added: bool,
}

async fn add_element(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AddElementRequest>, JsonRejection>,
) -> Result<Json<AddedResponse>, AppError> {
    let Json(req) = body?;
    req.validate()?;
    state.cache.upsert_element(&req.element, req.score).await?;
    Ok(Json(AddedResponse { added: true }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScoreRequest {
    #[validate(length(min = 1, max = 256))]
    pub element: String,
    pub new_score: f64,
}

#[derive(Debug, Serialize)]
struct UpdatedResponse {
    updated: bool,
}

async fn update_score(
    State(state): State<Arc<AppState>>,
    body: Result<Json<UpdateScoreRequest>, JsonRejection>,
) -> Result<Json<UpdatedResponse>, AppError> {
    let Json(req) = body?;
    req.validate()?;
    state.cache.upsert_element(&req.element, req.new_score).await?;
    Ok(Json(UpdatedResponse { updated: true }))
}

// По возрастанию счёта
async fn get_all_elements(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RankedElement>>, AppError> {
    Ok(Json(state.cache.elements(RangeOrder::Ascending).await?))
}

// По убыванию, первым идёт лидер
async fn get_ranked_elements(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RankedElement>>, AppError> {
    Ok(Json(state.cache.elements(RangeOrder::Descending).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct DeleteElementRequest {
    #[validate(length(min = 1, max = 256))]
    pub element: String,
}

async fn delete_element(
    State(state): State<Arc<AppState>>,
    body: Result<Json<DeleteElementRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(req) = body?;
    req.validate()?;
    if !state.cache.delete_element(&req.element).await? {
        return Err(AppError::NotFound(format!("Element {} not found", req.element)));
    }
    Ok(Json(MessageResponse::new("Element deleted successfully")))
}
