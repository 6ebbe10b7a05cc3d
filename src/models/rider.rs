use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    #[default]
    Bicycle,
    Motorcycle,
    Car,
    Van,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rider {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub vehicle_type: VehicleType,
    pub license_number: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Rider {
    pub fn contact(&self) -> RiderContact {
        RiderContact {
            id: self.id,
            name: self.name.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
        }
    }
}

/// Read model exposed next to deliveries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiderContact {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: String,
}
