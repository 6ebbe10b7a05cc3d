use std::sync::Arc;

use tokio::sync::broadcast;

use crate::engine::lifecycle::LifecycleEngine;
use crate::engine::tracking::RandomTrackingNumbers;
use crate::models::history::DeliveryEvent;
use crate::observability::metrics::Metrics;
use crate::storage::memory::InMemoryStore;

pub struct AppState {
    pub engine: LifecycleEngine,
    pub store: Arc<InMemoryStore>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize, tracking_number_length: usize) -> Self {
        let (delivery_events_tx, _unused_rx) =
            broadcast::channel::<DeliveryEvent>(event_buffer_size);
        let store = Arc::new(InMemoryStore::new());
        let metrics = Metrics::new();

        let engine = LifecycleEngine::new(
            store.clone(),
            store.clone(),
            Arc::new(RandomTrackingNumbers::new(tracking_number_length)),
            delivery_events_tx,
            metrics.clone(),
        );

        Self {
            engine,
            store,
            metrics,
        }
    }
}
