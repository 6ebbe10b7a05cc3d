use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::{StorageError, UniqueKey};
use crate::models::delivery::Delivery;
use crate::models::history::HistoryEntry;
use crate::models::rider::Rider;
use crate::storage::{
    DeliveryFilter, DeliveryRepository, DeliveryUpdate, RiderDirectory, SortOrder, StorageResult,
    UpdateOutcome,
};

struct DeliveryRecord {
    seq: u64,
    delivery: Delivery,
    history: Vec<HistoryEntry>,
}

/// Concurrent in-memory store.
///
/// A delivery and its history share one map entry, so a conditional update
/// and its history append run under the same shard write guard. Unique
/// indexes are claimed through `DashMap::entry` before the record becomes
/// visible.
#[derive(Default)]
pub struct InMemoryStore {
    deliveries: DashMap<Uuid, DeliveryRecord>,
    by_order_id: DashMap<String, Uuid>,
    by_tracking_number: DashMap<String, Uuid>,
    riders: DashMap<Uuid, Rider>,
    rider_emails: DashMap<String, Uuid>,
    rider_phones: DashMap<String, Uuid>,
    next_seq: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeliveryRepository for InMemoryStore {
    fn find_by_id(&self, id: Uuid) -> StorageResult<Option<Delivery>> {
        Ok(self
            .deliveries
            .get(&id)
            .map(|record| record.delivery.clone()))
    }

    fn find_by_order_id(&self, order_id: &str) -> StorageResult<Option<Delivery>> {
        let id = self.by_order_id.get(order_id).map(|entry| *entry.value());
        match id {
            Some(id) => self.find_by_id(id),
            None => Ok(None),
        }
    }

    fn find_by_tracking_number(&self, tracking_number: &str) -> StorageResult<Option<Delivery>> {
        let id = self
            .by_tracking_number
            .get(tracking_number)
            .map(|entry| *entry.value());
        match id {
            Some(id) => self.find_by_id(id),
            None => Ok(None),
        }
    }

    fn insert(&self, delivery: Delivery, initial: HistoryEntry) -> StorageResult<()> {
        let order_slot = match self.by_order_id.entry(delivery.order_id.clone()) {
            Entry::Occupied(_) => return Err(StorageError::DuplicateKey(UniqueKey::OrderId)),
            Entry::Vacant(slot) => slot,
        };
        let tracking_slot = match self
            .by_tracking_number
            .entry(delivery.tracking_number.clone())
        {
            Entry::Occupied(_) => {
                return Err(StorageError::DuplicateKey(UniqueKey::TrackingNumber));
            }
            Entry::Vacant(slot) => slot,
        };

        let id = delivery.id;
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.deliveries.insert(
            id,
            DeliveryRecord {
                seq,
                delivery,
                history: vec![initial],
            },
        );
        order_slot.insert(id);
        tracking_slot.insert(id);

        Ok(())
    }

    fn update_if_matches(
        &self,
        id: Uuid,
        expected: &DeliveryFilter,
        update: &DeliveryUpdate,
        entry: HistoryEntry,
    ) -> StorageResult<UpdateOutcome> {
        let Some(mut record) = self.deliveries.get_mut(&id) else {
            return Ok(UpdateOutcome::Missing);
        };

        if !expected.matches(&record.delivery) {
            return Ok(UpdateOutcome::Mismatch(record.delivery.clone()));
        }

        update.apply(&mut record.delivery);
        record.history.push(entry);

        Ok(UpdateOutcome::Updated(record.delivery.clone()))
    }

    fn history(&self, id: Uuid) -> StorageResult<Vec<HistoryEntry>> {
        Ok(self
            .deliveries
            .get(&id)
            .map(|record| record.history.clone())
            .unwrap_or_default())
    }

    fn list(&self, filter: &DeliveryFilter, sort: SortOrder) -> StorageResult<Vec<Delivery>> {
        let mut matched: Vec<(u64, Delivery)> = self
            .deliveries
            .iter()
            .filter(|record| filter.matches(&record.delivery))
            .map(|record| (record.seq, record.delivery.clone()))
            .collect();

        matched.sort_by_key(|(seq, delivery)| (delivery.created_at, *seq));
        if sort == SortOrder::NewestFirst {
            matched.reverse();
        }

        Ok(matched.into_iter().map(|(_, delivery)| delivery).collect())
    }

    fn delivery_count(&self) -> usize {
        self.deliveries.len()
    }
}

impl RiderDirectory for InMemoryStore {
    fn register(&self, rider: Rider) -> StorageResult<()> {
        let email_slot = match self.rider_emails.entry(rider.email.to_lowercase()) {
            Entry::Occupied(_) => return Err(StorageError::DuplicateKey(UniqueKey::RiderEmail)),
            Entry::Vacant(slot) => slot,
        };
        let phone_slot = match self.rider_phones.entry(rider.phone.clone()) {
            Entry::Occupied(_) => return Err(StorageError::DuplicateKey(UniqueKey::RiderPhone)),
            Entry::Vacant(slot) => slot,
        };

        let id = rider.id;
        self.riders.insert(id, rider);
        email_slot.insert(id);
        phone_slot.insert(id);

        Ok(())
    }

    fn find(&self, id: Uuid) -> StorageResult<Option<Rider>> {
        Ok(self.riders.get(&id).map(|entry| entry.value().clone()))
    }

    fn set_active(&self, id: Uuid, active: bool) -> StorageResult<Option<Rider>> {
        Ok(self.riders.get_mut(&id).map(|mut rider| {
            rider.is_active = active;
            rider.clone()
        }))
    }

    fn rider_count(&self) -> usize {
        self.riders.len()
    }
}
