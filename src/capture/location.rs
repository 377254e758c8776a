use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A fix reported by the device location service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub accuracy: Option<f64>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// Source of the device's current position. Platform services sit behind
/// this; the capture loop only asks once per decoded code.
pub trait LocationProvider: Send + Sync {
    fn current_location(&self) -> Result<Location, LocationError>;
}

/// Always reports the same fix.
pub struct FixedLocation(pub Location);

impl LocationProvider for FixedLocation {
    fn current_location(&self) -> Result<Location, LocationError> {
        Ok(self.0)
    }
}

/// Behaves like a device where location access was refused.
pub struct NoLocation;

impl LocationProvider for NoLocation {
    fn current_location(&self) -> Result<Location, LocationError> {
        Err(LocationError::PermissionDenied)
    }
}
