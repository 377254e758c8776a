use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::db::{helpers::epoch_millis, Database, NewScan, ScanRecord};

use super::location::{LocationError, LocationProvider};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// A QR code handed over by the decoder.
#[derive(Debug, Clone)]
pub struct DecodeEvent {
    pub payload: String,
    pub decoded_at: DateTime<Utc>,
}

impl DecodeEvent {
    pub fn now(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            decoded_at: Utc::now(),
        }
    }
}

/// Non-fatal notifications for the host UI.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureNotice {
    Saved(ScanRecord),
    LocationUnavailable(LocationError),
    SaveFailed(String),
}

/// Builds the row to store for one decode. Location is best effort: any
/// provider error leaves the coordinates empty and is returned alongside.
pub fn assemble_candidate(
    event: &DecodeEvent,
    location: &dyn LocationProvider,
) -> (NewScan, Option<LocationError>) {
    let mut candidate = NewScan::new(event.payload.clone(), epoch_millis(event.decoded_at));

    match location.current_location() {
        Ok(fix) => {
            candidate.latitude = Some(fix.latitude);
            candidate.longitude = Some(fix.longitude);
            candidate.altitude = fix.altitude;
            candidate.accuracy = fix.accuracy;
            (candidate, None)
        }
        Err(err) => (candidate, Some(err)),
    }
}

/// Persists decodes until the decode channel closes or `cancel_token` fires.
/// A failed write is reported and the loop keeps going.
pub async fn capture_loop(
    db: Database,
    location: Arc<dyn LocationProvider>,
    mut decodes: mpsc::Receiver<DecodeEvent>,
    notices: mpsc::UnboundedSender<CaptureNotice>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            event = decodes.recv() => {
                let Some(event) = event else {
                    log_info!("decode channel closed, capture loop exiting");
                    break;
                };
                record_decode(&db, location.as_ref(), event, &notices).await;
            }
            _ = cancel_token.cancelled() => {
                log_info!("capture loop shutting down");
                break;
            }
        }
    }
}

async fn record_decode(
    db: &Database,
    location: &dyn LocationProvider,
    event: DecodeEvent,
    notices: &mpsc::UnboundedSender<CaptureNotice>,
) {
    let (candidate, location_err) = assemble_candidate(&event, location);

    if let Some(err) = location_err {
        log_warn!("recording scan without location: {err}");
        notify(notices, CaptureNotice::LocationUnavailable(err));
    }

    match db.create_scan(candidate).await {
        Ok(record) => {
            log_info!("saved scan {} ({} bytes)", record.id, record.qr_data.len());
            notify(notices, CaptureNotice::Saved(record));
        }
        Err(err) => {
            log_error!("failed to save scan: {err}");
            notify(
                notices,
                CaptureNotice::SaveFailed("Could not save the scan. Please try again.".into()),
            );
        }
    }
}

fn notify(notices: &mpsc::UnboundedSender<CaptureNotice>, notice: CaptureNotice) {
    // Nobody listening is fine; capture carries on regardless.
    let _ = notices.send(notice);
}
