use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::fee::{compute_fee, FeeBreakdown};
use crate::engine::tracking::{normalize_tracking_number, TrackingNumberGenerator};
use crate::engine::transitions::{ensure_transition, CANCELLABLE};
use crate::error::{DeliveryError, StorageError, UniqueKey};
use crate::models::delivery::{Delivery, DeliveryStatus, DeliveryType, GeoPoint, NewDelivery};
use crate::models::history::{Actor, ActorRole, DeliveryEvent, HistoryEntry};
use crate::models::rider::RiderContact;
use crate::observability::metrics::Metrics;
use crate::storage::{
    DeliveryFilter, DeliveryRepository, DeliveryUpdate, RiderDirectory, RiderMatch, SortOrder,
    UpdateOutcome,
};

const TRACKING_NUMBER_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedDelivery {
    pub delivery: Delivery,
    pub rider: Option<RiderContact>,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryView {
    pub delivery: Delivery,
    pub rider: Option<RiderContact>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListFilter {
    pub status: Option<DeliveryStatus>,
    pub rider_id: Option<Uuid>,
}

/// Optional details a rider attaches to a status update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusDetails {
    pub notes: Option<String>,
    pub location: Option<GeoPoint>,
}

/// Owns every write to deliveries and their history.
///
/// Each status change is a single conditional update against the repository,
/// keyed on the state the guard was evaluated against. Nothing is held
/// between calls.
pub struct LifecycleEngine {
    deliveries: Arc<dyn DeliveryRepository>,
    riders: Arc<dyn RiderDirectory>,
    tracking: Arc<dyn TrackingNumberGenerator>,
    events_tx: broadcast::Sender<DeliveryEvent>,
    metrics: Metrics,
}

impl LifecycleEngine {
    pub fn new(
        deliveries: Arc<dyn DeliveryRepository>,
        riders: Arc<dyn RiderDirectory>,
        tracking: Arc<dyn TrackingNumberGenerator>,
        events_tx: broadcast::Sender<DeliveryEvent>,
        metrics: Metrics,
    ) -> Self {
        Self {
            deliveries,
            riders,
            tracking,
            events_tx,
            metrics,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeliveryEvent> {
        self.events_tx.subscribe()
    }

    pub fn quote(
        &self,
        store: &GeoPoint,
        customer: &GeoPoint,
        delivery_type: DeliveryType,
    ) -> Result<FeeBreakdown, DeliveryError> {
        store.validate("store_location")?;
        customer.validate("customer_location")?;
        Ok(compute_fee(store, customer, delivery_type))
    }

    pub fn create(&self, data: NewDelivery) -> Result<Delivery, DeliveryError> {
        self.timed("create", || {
            data.validate()?;

            let breakdown = compute_fee(
                &data.store_location,
                &data.customer_location,
                data.delivery_type,
            );
            let now = Utc::now();
            let mut delivery = Delivery {
                id: Uuid::new_v4(),
                order_id: data.order_id.trim().to_string(),
                tracking_number: String::new(),
                store_location: data.store_location,
                customer_location: data.customer_location,
                delivery_type: data.delivery_type,
                fee: breakdown.fee,
                status: DeliveryStatus::Pending,
                rider_id: None,
                customer_info: data.customer_info,
                store_info: data.store_info,
                notes: data.notes,
                estimated_delivery_time: data.estimated_delivery_time,
                actual_delivery_time: None,
                created_at: now,
                updated_at: now,
            };

            for attempt in 1..=TRACKING_NUMBER_ATTEMPTS {
                let tracking_number = normalize_tracking_number(&self.tracking.generate());
                if tracking_number.eq_ignore_ascii_case(&delivery.order_id) {
                    continue;
                }
                delivery.tracking_number = tracking_number;

                let entry = HistoryEntry::new(delivery.id, DeliveryStatus::Pending, Actor::SYSTEM);
                match self.deliveries.insert(delivery.clone(), entry.clone()) {
                    Ok(()) => {
                        self.metrics.deliveries_created_total.inc();
                        self.record_transition(DeliveryStatus::Pending);
                        info!(
                            delivery_id = %delivery.id,
                            order_id = %delivery.order_id,
                            tracking_number = %delivery.tracking_number,
                            fee = delivery.fee,
                            distance_km = breakdown.distance_km,
                            "delivery created"
                        );
                        self.publish(&delivery, entry);
                        return Ok(delivery);
                    }
                    Err(StorageError::DuplicateKey(UniqueKey::OrderId)) => {
                        return Err(DeliveryError::DuplicateOrder(delivery.order_id));
                    }
                    Err(StorageError::DuplicateKey(UniqueKey::TrackingNumber)) => {
                        warn!(attempt, "tracking number collision; regenerating");
                    }
                    Err(err) => return Err(err.into()),
                }
            }

            Err(DeliveryError::StorageUnavailable(format!(
                "no unique tracking number after {TRACKING_NUMBER_ATTEMPTS} attempts"
            )))
        })
    }

    /// Assigns a PENDING, unassigned delivery to `rider_id`. Of any number of
    /// concurrent attempts on the same delivery, at most one succeeds. Only
    /// registered, active riders may accept.
    pub fn accept(&self, delivery_id: Uuid, rider_id: Uuid) -> Result<Delivery, DeliveryError> {
        self.timed("accept", || {
            match self.riders.find(rider_id)? {
                Some(rider) if rider.is_active => {}
                Some(_) => return Err(DeliveryError::RiderInactive(rider_id)),
                None => return Err(DeliveryError::NotFound(format!("rider {rider_id}"))),
            }

            let expected = DeliveryFilter::status(DeliveryStatus::Pending)
                .with_rider(RiderMatch::Unassigned);
            let mut update = DeliveryUpdate::status(DeliveryStatus::Accepted);
            update.rider_id = Some(rider_id);
            let entry =
                HistoryEntry::new(delivery_id, DeliveryStatus::Accepted, Actor::rider(rider_id));

            match self
                .deliveries
                .update_if_matches(delivery_id, &expected, &update, entry.clone())?
            {
                UpdateOutcome::Updated(delivery) => {
                    self.record_transition(DeliveryStatus::Accepted);
                    info!(delivery_id = %delivery_id, rider_id = %rider_id, "delivery accepted");
                    self.publish(&delivery, entry);
                    Ok(delivery)
                }
                UpdateOutcome::Missing | UpdateOutcome::Mismatch(_) => {
                    self.metrics.acceptance_conflicts_total.inc();
                    Err(DeliveryError::NotAvailable(delivery_id))
                }
            }
        })
    }

    pub fn advance_status(
        &self,
        delivery_id: Uuid,
        new_status: DeliveryStatus,
        rider_id: Uuid,
        details: StatusDetails,
    ) -> Result<Delivery, DeliveryError> {
        self.timed("advance_status", || {
            if let Some(location) = &details.location {
                location.validate("location")?;
            }

            let current = self
                .deliveries
                .find_by_id(delivery_id)?
                .filter(|delivery| delivery.rider_id == Some(rider_id))
                .ok_or_else(|| not_assigned(delivery_id, rider_id))?;

            ensure_transition(current.status, new_status)?;

            let expected = DeliveryFilter::status(current.status)
                .with_rider(RiderMatch::AssignedTo(rider_id));
            let mut update = DeliveryUpdate::status(new_status);
            if new_status == DeliveryStatus::Delivered {
                update.actual_delivery_time = Some(update.updated_at);
            }
            let entry = HistoryEntry::new(delivery_id, new_status, Actor::rider(rider_id))
                .with_notes(details.notes)
                .with_location(details.location);

            match self
                .deliveries
                .update_if_matches(delivery_id, &expected, &update, entry.clone())?
            {
                UpdateOutcome::Updated(delivery) => {
                    self.record_transition(new_status);
                    info!(
                        delivery_id = %delivery_id,
                        rider_id = %rider_id,
                        from = %current.status,
                        to = %new_status,
                        "delivery status advanced"
                    );
                    self.publish(&delivery, entry);
                    Ok(delivery)
                }
                UpdateOutcome::Missing => Err(not_assigned(delivery_id, rider_id)),
                UpdateOutcome::Mismatch(observed) => Err(DeliveryError::InvalidTransition {
                    from: observed.status,
                    to: new_status,
                }),
            }
        })
    }

    /// Cancels a delivery that has not been picked up yet. A rider may only
    /// cancel deliveries assigned to them.
    pub fn cancel(&self, delivery_id: Uuid, actor: Actor) -> Result<Delivery, DeliveryError> {
        self.timed("cancel", || {
            let rider = match actor.role {
                ActorRole::Rider => RiderMatch::AssignedTo(actor.id),
                ActorRole::Admin | ActorRole::System => RiderMatch::Any,
            };

            let current = self
                .deliveries
                .find_by_id(delivery_id)?
                .filter(|delivery| rider.matches(delivery.rider_id))
                .ok_or_else(|| DeliveryError::NotFound(format!("delivery {delivery_id}")))?;

            ensure_transition(current.status, DeliveryStatus::Cancelled)?;

            let expected = DeliveryFilter {
                statuses: CANCELLABLE.to_vec(),
                rider,
            };
            let update = DeliveryUpdate::status(DeliveryStatus::Cancelled);
            let entry = HistoryEntry::new(delivery_id, DeliveryStatus::Cancelled, actor);

            match self
                .deliveries
                .update_if_matches(delivery_id, &expected, &update, entry.clone())?
            {
                UpdateOutcome::Updated(delivery) => {
                    self.record_transition(DeliveryStatus::Cancelled);
                    info!(
                        delivery_id = %delivery_id,
                        actor_id = %actor.id,
                        actor_role = %actor.role,
                        from = %current.status,
                        "delivery cancelled"
                    );
                    self.publish(&delivery, entry);
                    Ok(delivery)
                }
                UpdateOutcome::Missing => {
                    Err(DeliveryError::NotFound(format!("delivery {delivery_id}")))
                }
                UpdateOutcome::Mismatch(observed) => Err(DeliveryError::InvalidTransition {
                    from: observed.status,
                    to: DeliveryStatus::Cancelled,
                }),
            }
        })
    }

    pub fn track(&self, tracking_number: &str) -> Result<TrackedDelivery, DeliveryError> {
        let tracking_number = normalize_tracking_number(tracking_number);
        let delivery = self
            .deliveries
            .find_by_tracking_number(&tracking_number)?
            .ok_or_else(|| DeliveryError::NotFound(format!("tracking number {tracking_number}")))?;

        let rider = self.rider_contact(delivery.rider_id)?;
        let history = self.deliveries.history(delivery.id)?;

        Ok(TrackedDelivery {
            delivery,
            rider,
            history,
        })
    }

    pub fn history(&self, delivery_id: Uuid) -> Result<Vec<HistoryEntry>, DeliveryError> {
        if self.deliveries.find_by_id(delivery_id)?.is_none() {
            return Err(DeliveryError::NotFound(format!("delivery {delivery_id}")));
        }
        Ok(self.deliveries.history(delivery_id)?)
    }

    /// PENDING, unassigned deliveries in first-come-first-served order.
    pub fn list_available(&self) -> Result<Vec<Delivery>, DeliveryError> {
        let filter =
            DeliveryFilter::status(DeliveryStatus::Pending).with_rider(RiderMatch::Unassigned);
        Ok(self.deliveries.list(&filter, SortOrder::OldestFirst)?)
    }

    pub fn list_for_rider(&self, rider_id: Uuid) -> Result<Vec<Delivery>, DeliveryError> {
        let filter = DeliveryFilter::default().with_rider(RiderMatch::AssignedTo(rider_id));
        Ok(self.deliveries.list(&filter, SortOrder::NewestFirst)?)
    }

    pub fn list_all(&self, filter: &ListFilter) -> Result<Vec<DeliveryView>, DeliveryError> {
        let query = DeliveryFilter {
            statuses: filter.status.into_iter().collect(),
            rider: filter
                .rider_id
                .map(RiderMatch::AssignedTo)
                .unwrap_or_default(),
        };

        self.deliveries
            .list(&query, SortOrder::NewestFirst)?
            .into_iter()
            .map(|delivery| {
                let rider = self.rider_contact(delivery.rider_id)?;
                Ok(DeliveryView { delivery, rider })
            })
            .collect()
    }

    fn rider_contact(&self, rider_id: Option<Uuid>) -> Result<Option<RiderContact>, DeliveryError> {
        match rider_id {
            Some(id) => Ok(self.riders.contact(id)?),
            None => Ok(None),
        }
    }

    fn record_transition(&self, status: DeliveryStatus) {
        self.metrics
            .status_transitions_total
            .with_label_values(&[status.as_str()])
            .inc();
    }

    fn publish(&self, delivery: &Delivery, entry: HistoryEntry) {
        let _ = self.events_tx.send(DeliveryEvent {
            delivery_id: delivery.id,
            tracking_number: delivery.tracking_number.clone(),
            entry,
        });
    }

    fn timed<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce() -> Result<T, DeliveryError>,
    ) -> Result<T, DeliveryError> {
        let start = Instant::now();
        let result = f();
        self.metrics
            .observe(operation, result.is_ok(), start.elapsed().as_secs_f64());

        if let Err(err) = &result {
            match err {
                DeliveryError::StorageUnavailable(_) => {
                    error!(operation, error = %err, "lifecycle operation failed");
                }
                _ => {
                    self.metrics
                        .rejected_operations_total
                        .with_label_values(&[err.kind()])
                        .inc();
                    warn!(operation, error = %err, "lifecycle operation rejected");
                }
            }
        }

        result
    }
}

fn not_assigned(delivery_id: Uuid, rider_id: Uuid) -> DeliveryError {
    DeliveryError::NotFound(format!(
        "delivery {delivery_id} not found or not assigned to rider {rider_id}"
    ))
}
