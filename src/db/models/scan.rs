//! Scan-related data models.
//!
//! A scan is one decode event: the raw payload, an optional fix from the
//! device's location service, and the capture time in epoch milliseconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::error::{ScanError, ScanResult};

/// A persisted scan row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanRecord {
    pub id: i64,
    pub qr_data: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub timestamp: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a scan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewScan {
    pub qr_data: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub accuracy: Option<f64>,
    pub timestamp: i64,
}

/// Partial update. `None` (absent or JSON `null`) leaves the stored value
/// alone; `Some(0.0)` is a real value and is written.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScanPatch {
    pub qr_data: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub timestamp: Option<i64>,
}

fn check_payload(qr_data: &str) -> ScanResult<()> {
    if qr_data.is_empty() {
        return Err(ScanError::invalid("qr_data is required"));
    }
    Ok(())
}

fn check_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> ScanResult<()> {
    if latitude.is_some() != longitude.is_some() {
        return Err(ScanError::invalid(
            "latitude and longitude must be provided together",
        ));
    }
    Ok(())
}

impl NewScan {
    pub fn new(qr_data: impl Into<String>, timestamp: i64) -> Self {
        Self {
            qr_data: qr_data.into(),
            latitude: None,
            longitude: None,
            altitude: None,
            accuracy: None,
            timestamp,
        }
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn validate(&self) -> ScanResult<()> {
        check_payload(&self.qr_data)?;
        check_coordinates(self.latitude, self.longitude)
    }
}

impl ScanPatch {
    pub fn is_empty(&self) -> bool {
        self.qr_data.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
            && self.altitude.is_none()
            && self.accuracy.is_none()
            && self.timestamp.is_none()
    }
}

impl ScanRecord {
    /// Returns a copy with every provided patch field written over this row.
    /// The merged row must still hold a full coordinate pair or none.
    pub fn merged(&self, patch: &ScanPatch) -> ScanResult<ScanRecord> {
        if let Some(qr_data) = patch.qr_data.as_deref() {
            check_payload(qr_data)?;
        }

        let merged = ScanRecord {
            id: self.id,
            qr_data: patch.qr_data.clone().unwrap_or_else(|| self.qr_data.clone()),
            latitude: patch.latitude.or(self.latitude),
            longitude: patch.longitude.or(self.longitude),
            altitude: patch.altitude.or(self.altitude),
            accuracy: patch.accuracy.or(self.accuracy),
            timestamp: patch.timestamp.unwrap_or(self.timestamp),
            created_at: self.created_at,
        };

        check_coordinates(merged.latitude, merged.longitude)?;
        Ok(merged)
    }

    pub fn has_location(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// One-line rendering for terminal history listings.
    pub fn summary(&self) -> String {
        let captured = DateTime::<Utc>::from_timestamp_millis(self.timestamp)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| self.timestamp.to_string());

        let location = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => match self.accuracy {
                Some(acc) => format!("{lat:.5},{lon:.5} ±{acc:.0}m"),
                None => format!("{lat:.5},{lon:.5}"),
            },
            _ => "no location".to_string(),
        };

        format!("#{} {} [{}] {}", self.id, captured, location, self.qr_data)
    }
}
