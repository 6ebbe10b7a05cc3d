use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::fee::FeeBreakdown;
use crate::engine::lifecycle::TrackedDelivery;
use crate::error::AppError;
use crate::models::delivery::{Delivery, DeliveryType, GeoPoint, NewDelivery};
use crate::models::history::Actor;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deliveries", post(create_delivery))
        .route("/deliveries/fee", post(quote_fee))
        .route("/deliveries/track/:tracking_number", get(track_delivery))
        .route("/deliveries/:id", delete(cancel_delivery))
}

#[derive(Deserialize)]
pub struct QuoteRequest {
    pub store_location: GeoPoint,
    pub customer_location: GeoPoint,
    #[serde(default)]
    pub delivery_type: DeliveryType,
}

async fn quote_fee(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QuoteRequest>,
) -> Result<Json<FeeBreakdown>, AppError> {
    let breakdown = state.engine.quote(
        &payload.store_location,
        &payload.customer_location,
        payload.delivery_type,
    )?;
    Ok(Json(breakdown))
}

async fn create_delivery(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewDelivery>,
) -> Result<(StatusCode, Json<Delivery>), AppError> {
    let delivery = state.engine.create(payload)?;
    Ok((StatusCode::CREATED, Json(delivery)))
}

async fn track_delivery(
    State(state): State<Arc<AppState>>,
    Path(tracking_number): Path<String>,
) -> Result<Json<TrackedDelivery>, AppError> {
    let tracked = state.engine.track(&tracking_number)?;
    Ok(Json(tracked))
}

async fn cancel_delivery(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Delivery>, AppError> {
    let delivery = state.engine.cancel(id, actor)?;
    Ok(Json(delivery))
}
