use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DeliveryError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn validate(&self, field: &str) -> Result<(), DeliveryError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(DeliveryError::Validation(format!(
                "{field}.lat must be within [-90, 90], got {}",
                self.lat
            )));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(DeliveryError::Validation(format!(
                "{field}.lng must be within [-180, 180], got {}",
                self.lng
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryType {
    #[default]
    Standard,
    Express,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Pending,
    Accepted,
    PickedUp,
    InTransit,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    pub const ALL: [DeliveryStatus; 6] = [
        DeliveryStatus::Pending,
        DeliveryStatus::Accepted,
        DeliveryStatus::PickedUp,
        DeliveryStatus::InTransit,
        DeliveryStatus::Delivered,
        DeliveryStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "PENDING",
            DeliveryStatus::Accepted => "ACCEPTED",
            DeliveryStatus::PickedUp => "PICKED_UP",
            DeliveryStatus::InTransit => "IN_TRANSIT",
            DeliveryStatus::Delivered => "DELIVERED",
            DeliveryStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactInfo {
    pub name: String,
    pub phone: String,
    pub address: String,
}

impl ContactInfo {
    fn validate(&self, field: &str) -> Result<(), DeliveryError> {
        let blank = [
            ("name", &self.name),
            ("phone", &self.phone),
            ("address", &self.address),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty());

        match blank {
            Some((name, _)) => Err(DeliveryError::Validation(format!(
                "{field}.{name} cannot be empty"
            ))),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    pub order_id: String,
    pub tracking_number: String,
    pub store_location: GeoPoint,
    pub customer_location: GeoPoint,
    pub delivery_type: DeliveryType,
    pub fee: f64,
    pub status: DeliveryStatus,
    pub rider_id: Option<Uuid>,
    pub customer_info: Option<ContactInfo>,
    pub store_info: Option<ContactInfo>,
    pub notes: Option<String>,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    pub actual_delivery_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for a new delivery. Everything else on [`Delivery`]
/// is derived by the lifecycle engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDelivery {
    pub order_id: String,
    pub store_location: GeoPoint,
    pub customer_location: GeoPoint,
    #[serde(default)]
    pub delivery_type: DeliveryType,
    #[serde(default)]
    pub customer_info: Option<ContactInfo>,
    #[serde(default)]
    pub store_info: Option<ContactInfo>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub estimated_delivery_time: Option<DateTime<Utc>>,
}

impl NewDelivery {
    pub fn validate(&self) -> Result<(), DeliveryError> {
        if self.order_id.trim().is_empty() {
            return Err(DeliveryError::Validation(
                "order_id cannot be empty".to_string(),
            ));
        }

        self.store_location.validate("store_location")?;
        self.customer_location.validate("customer_location")?;

        if let Some(info) = &self.customer_info {
            info.validate("customer_info")?;
        }
        if let Some(info) = &self.store_info {
            info.validate("store_info")?;
        }

        Ok(())
    }
}
