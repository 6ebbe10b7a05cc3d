use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, put};
use axum::Json;
use axum::Router;
use uuid::Uuid;

use crate::api::rest::actor::AdminActor;
use crate::engine::lifecycle::{DeliveryView, ListFilter};
use crate::error::AppError;
use crate::models::history::HistoryEntry;
use crate::models::rider::Rider;
use crate::state::AppState;
use crate::storage::RiderDirectory;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/deliveries", get(list_deliveries))
        .route("/admin/deliveries/:id/history", get(delivery_history))
        .route("/admin/riders/:id/deactivate", put(deactivate_rider))
}

async fn list_deliveries(
    State(state): State<Arc<AppState>>,
    _admin: AdminActor,
    Query(filter): Query<ListFilter>,
) -> Result<Json<Vec<DeliveryView>>, AppError> {
    Ok(Json(state.engine.list_all(&filter)?))
}

async fn delivery_history(
    State(state): State<Arc<AppState>>,
    _admin: AdminActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    Ok(Json(state.engine.history(id)?))
}

async fn deactivate_rider(
    State(state): State<Arc<AppState>>,
    AdminActor(admin): AdminActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Rider>, AppError> {
    let rider = state
        .store
        .set_active(id, false)?
        .ok_or_else(|| AppError::NotFound(format!("rider {id}")))?;

    tracing::info!(rider_id = %id, admin_id = %admin.id, "rider deactivated");

    Ok(Json(rider))
}
