use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::actor::RiderActor;
use crate::engine::lifecycle::StatusDetails;
use crate::error::AppError;
use crate::models::delivery::{Delivery, DeliveryStatus, GeoPoint};
use crate::models::rider::{Rider, VehicleType};
use crate::state::AppState;
use crate::storage::RiderDirectory;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/riders", post(register_rider))
        .route("/riders/deliveries", get(list_available))
        .route("/riders/deliveries/:id/accept", post(accept_delivery))
        .route("/riders/deliveries/:id/status", put(update_delivery_status))
        .route("/riders/my-deliveries", get(list_my_deliveries))
}

#[derive(Deserialize)]
pub struct RegisterRiderRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub vehicle_type: VehicleType,
    #[serde(default)]
    pub license_number: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: DeliveryStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

async fn register_rider(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRiderRequest>,
) -> Result<(StatusCode, Json<Rider>), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    if !payload.email.contains('@') {
        return Err(AppError::BadRequest("email is not valid".to_string()));
    }

    if payload.phone.trim().is_empty() {
        return Err(AppError::BadRequest("phone cannot be empty".to_string()));
    }

    let rider = Rider {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_string(),
        email: payload.email.trim().to_lowercase(),
        phone: payload.phone.trim().to_string(),
        vehicle_type: payload.vehicle_type,
        license_number: payload.license_number,
        is_active: true,
        created_at: Utc::now(),
    };

    state.store.register(rider.clone())?;
    tracing::info!(rider_id = %rider.id, "rider registered");

    Ok((StatusCode::CREATED, Json(rider)))
}

async fn list_available(
    State(state): State<Arc<AppState>>,
    RiderActor(_rider_id): RiderActor,
) -> Result<Json<Vec<Delivery>>, AppError> {
    Ok(Json(state.engine.list_available()?))
}

async fn accept_delivery(
    State(state): State<Arc<AppState>>,
    RiderActor(rider_id): RiderActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Delivery>, AppError> {
    let delivery = state.engine.accept(id, rider_id)?;
    Ok(Json(delivery))
}

async fn update_delivery_status(
    State(state): State<Arc<AppState>>,
    RiderActor(rider_id): RiderActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Delivery>, AppError> {
    if matches!(
        payload.status,
        DeliveryStatus::Pending | DeliveryStatus::Accepted
    ) {
        return Err(AppError::BadRequest(format!(
            "status must be one of PICKED_UP, IN_TRANSIT, DELIVERED, CANCELLED, got {}",
            payload.status
        )));
    }

    let details = StatusDetails {
        notes: payload.notes,
        location: payload.location,
    };
    let delivery = state
        .engine
        .advance_status(id, payload.status, rider_id, details)?;

    Ok(Json(delivery))
}

async fn list_my_deliveries(
    State(state): State<Arc<AppState>>,
    RiderActor(rider_id): RiderActor,
) -> Result<Json<Vec<Delivery>>, AppError> {
    Ok(Json(state.engine.list_for_rider(rider_id)?))
}
