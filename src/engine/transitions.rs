use crate::error::DeliveryError;
use crate::models::delivery::DeliveryStatus;

/// Legal next states for `from`. Terminal states have none.
pub fn allowed_next(from: DeliveryStatus) -> &'static [DeliveryStatus] {
    use DeliveryStatus::*;

    match from {
        Pending => &[Accepted, Cancelled],
        Accepted => &[PickedUp, Cancelled],
        PickedUp => &[InTransit],
        InTransit => &[Delivered],
        Delivered | Cancelled => &[],
    }
}

pub fn can_transition(from: DeliveryStatus, to: DeliveryStatus) -> bool {
    allowed_next(from).contains(&to)
}

pub fn ensure_transition(from: DeliveryStatus, to: DeliveryStatus) -> Result<(), DeliveryError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(DeliveryError::InvalidTransition { from, to })
    }
}

/// States from which a delivery may still be cancelled.
pub const CANCELLABLE: [DeliveryStatus; 2] = [DeliveryStatus::Pending, DeliveryStatus::Accepted];
