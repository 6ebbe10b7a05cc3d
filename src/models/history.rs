use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::delivery::{DeliveryStatus, GeoPoint};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Rider,
    Admin,
    System,
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActorRole::Rider => "rider",
            ActorRole::Admin => "admin",
            ActorRole::System => "system",
        })
    }
}

/// Verified identity performing an operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    /// The actor recorded against the initial PENDING entry of every delivery.
    pub const SYSTEM: Actor = Actor {
        id: Uuid::nil(),
        role: ActorRole::System,
    };

    pub fn rider(id: Uuid) -> Self {
        Self {
            id,
            role: ActorRole::Rider,
        }
    }

    pub fn admin(id: Uuid) -> Self {
        Self {
            id,
            role: ActorRole::Admin,
        }
    }
}

/// Immutable audit record of one status transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub delivery_id: Uuid,
    pub status: DeliveryStatus,
    pub updated_by: Actor,
    pub notes: Option<String>,
    pub location: Option<GeoPoint>,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(delivery_id: Uuid, status: DeliveryStatus, updated_by: Actor) -> Self {
        Self {
            id: Uuid::new_v4(),
            delivery_id,
            status,
            updated_by,
            notes: None,
            location: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn with_location(mut self, location: Option<GeoPoint>) -> Self {
        self.location = location;
        self
    }
}

/// Broadcast to websocket subscribers after every successful write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub delivery_id: Uuid,
    pub tracking_number: String,
    pub entry: HistoryEntry,
}
