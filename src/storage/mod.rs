//! Storage seams for the lifecycle engine.
//!
//! The engine never reads-then-writes a delivery: every status change goes
//! through [`DeliveryRepository::update_if_matches`], which checks the
//! expected state and applies the change together with its history entry.

pub mod memory;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StorageError;
use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::models::history::HistoryEntry;
use crate::models::rider::{Rider, RiderContact};

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RiderMatch {
    #[default]
    Any,
    Unassigned,
    AssignedTo(Uuid),
}

impl RiderMatch {
    pub fn matches(&self, rider_id: Option<Uuid>) -> bool {
        match self {
            RiderMatch::Any => true,
            RiderMatch::Unassigned => rider_id.is_none(),
            RiderMatch::AssignedTo(expected) => rider_id == Some(*expected),
        }
    }
}

/// Predicate over the mutable fields of a delivery. An empty `statuses`
/// list matches any status.
#[derive(Debug, Clone, Default)]
pub struct DeliveryFilter {
    pub statuses: Vec<DeliveryStatus>,
    pub rider: RiderMatch,
}

impl DeliveryFilter {
    pub fn status(status: DeliveryStatus) -> Self {
        Self {
            statuses: vec![status],
            rider: RiderMatch::Any,
        }
    }

    pub fn with_rider(mut self, rider: RiderMatch) -> Self {
        self.rider = rider;
        self
    }

    pub fn matches(&self, delivery: &Delivery) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&delivery.status))
            && self.rider.matches(delivery.rider_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    OldestFirst,
    NewestFirst,
}

/// Fields written by a status transition.
#[derive(Debug, Clone)]
pub struct DeliveryUpdate {
    pub status: DeliveryStatus,
    pub rider_id: Option<Uuid>,
    pub actual_delivery_time: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryUpdate {
    pub fn status(status: DeliveryStatus) -> Self {
        Self {
            status,
            rider_id: None,
            actual_delivery_time: None,
            updated_at: Utc::now(),
        }
    }

    /// Applies the update. `rider_id` and `actual_delivery_time` are only
    /// ever set, never cleared.
    pub fn apply(&self, delivery: &mut Delivery) {
        delivery.status = self.status;
        if let Some(rider_id) = self.rider_id {
            delivery.rider_id = Some(rider_id);
        }
        if let Some(at) = self.actual_delivery_time {
            delivery.actual_delivery_time = Some(at);
        }
        delivery.updated_at = self.updated_at;
    }
}

#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    Updated(Delivery),
    Missing,
    /// The delivery exists but did not satisfy the expected filter. Carries
    /// the state that was observed instead.
    Mismatch(Delivery),
}

pub trait DeliveryRepository: Send + Sync {
    fn find_by_id(&self, id: Uuid) -> StorageResult<Option<Delivery>>;

    fn find_by_order_id(&self, order_id: &str) -> StorageResult<Option<Delivery>>;

    fn find_by_tracking_number(&self, tracking_number: &str) -> StorageResult<Option<Delivery>>;

    /// Stores a new delivery with its first history entry, all or nothing.
    fn insert(&self, delivery: Delivery, initial: HistoryEntry) -> StorageResult<()>;

    /// Applies `update` and appends `entry` only if the stored delivery
    /// matches `expected`. Implementations that cannot write both in one step
    /// must undo the status write when the history append fails.
    fn update_if_matches(
        &self,
        id: Uuid,
        expected: &DeliveryFilter,
        update: &DeliveryUpdate,
        entry: HistoryEntry,
    ) -> StorageResult<UpdateOutcome>;

    fn history(&self, id: Uuid) -> StorageResult<Vec<HistoryEntry>>;

    fn list(&self, filter: &DeliveryFilter, sort: SortOrder) -> StorageResult<Vec<Delivery>>;

    fn delivery_count(&self) -> usize;
}

pub trait RiderDirectory: Send + Sync {
    fn register(&self, rider: Rider) -> StorageResult<()>;

    fn find(&self, id: Uuid) -> StorageResult<Option<Rider>>;

    /// Returns the updated rider, or `None` if no rider has that id.
    fn set_active(&self, id: Uuid, active: bool) -> StorageResult<Option<Rider>>;

    fn contact(&self, id: Uuid) -> StorageResult<Option<RiderContact>> {
        Ok(self.find(id)?.map(|rider| rider.contact()))
    }

    fn rider_count(&self) -> usize;
}
