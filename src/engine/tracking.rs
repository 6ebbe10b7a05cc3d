use rand::distr::Alphanumeric;
use rand::Rng;

pub const DEFAULT_TRACKING_NUMBER_LENGTH: usize = 10;

pub trait TrackingNumberGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Uppercase alphanumeric tracking numbers drawn from the thread-local RNG.
#[derive(Debug, Clone)]
pub struct RandomTrackingNumbers {
    length: usize,
}

impl RandomTrackingNumbers {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Default for RandomTrackingNumbers {
    fn default() -> Self {
        Self::new(DEFAULT_TRACKING_NUMBER_LENGTH)
    }
}

impl TrackingNumberGenerator for RandomTrackingNumbers {
    fn generate(&self) -> String {
        let raw: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect();
        normalize_tracking_number(&raw)
    }
}

/// Tracking numbers are stored and looked up in uppercase.
pub fn normalize_tracking_number(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}
