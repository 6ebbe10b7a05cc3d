use serde::{Deserialize, Serialize};

use crate::geo::haversine_km;
use crate::models::delivery::{DeliveryType, GeoPoint};

pub const BASE_PRICE: f64 = 5.0;
pub const FREE_DISTANCE_KM: f64 = 2.0;
pub const PRICE_PER_EXTRA_KM: f64 = 1.5;
pub const EXPRESS_MULTIPLIER: f64 = 1.2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FeeBreakdown {
    pub fee: f64,
    pub distance_km: f64,
    pub base_price: f64,
    pub distance_charge: f64,
    pub express_surcharge: f64,
}

/// Prices a delivery from its two endpoints.
///
/// Only whole kilometres beyond the first two are charged. The express
/// surcharge is taken on the pre-multiplier subtotal, so
/// `fee == base_price + distance_charge + express_surcharge` up to rounding.
pub fn compute_fee(
    store: &GeoPoint,
    customer: &GeoPoint,
    delivery_type: DeliveryType,
) -> FeeBreakdown {
    fee_for_distance(haversine_km(store, customer), delivery_type)
}

pub fn fee_for_distance(distance_km: f64, delivery_type: DeliveryType) -> FeeBreakdown {
    let distance_km = distance_km.max(0.0);

    let distance_charge = if distance_km > FREE_DISTANCE_KM {
        (distance_km - FREE_DISTANCE_KM).floor() * PRICE_PER_EXTRA_KM
    } else {
        0.0
    };
    let subtotal = BASE_PRICE + distance_charge;

    let (fee, express_surcharge) = match delivery_type {
        DeliveryType::Standard => (subtotal, 0.0),
        DeliveryType::Express => (
            subtotal * EXPRESS_MULTIPLIER,
            subtotal * (EXPRESS_MULTIPLIER - 1.0),
        ),
    };

    FeeBreakdown {
        fee: round_cents(fee),
        distance_km: round_cents(distance_km),
        base_price: BASE_PRICE,
        distance_charge,
        express_surcharge: round_cents(express_surcharge),
    }
}

/// Rounds half away from zero to two decimal places.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
