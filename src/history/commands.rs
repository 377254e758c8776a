//! In-app calls behind the history view. Errors come back as display
//! strings ready for an alert.

use crate::{
    db::{ScanPatch, ScanRecord},
    AppState,
};

pub async fn list_scans(state: &AppState) -> Result<Vec<ScanRecord>, String> {
    let db = &state.db;
    db.list_scans().await.map_err(|e| e.to_string())
}

pub async fn get_scan(state: &AppState, scan_id: i64) -> Result<Option<ScanRecord>, String> {
    let db = &state.db;
    db.get_scan(scan_id).await.map_err(|e| e.to_string())
}

/// `true` when a row was removed.
pub async fn delete_scan(state: &AppState, scan_id: i64) -> Result<bool, String> {
    let db = &state.db;
    db.delete_scan(scan_id)
        .await
        .map(|changes| changes > 0)
        .map_err(|e| e.to_string())
}

pub async fn update_scan(
    state: &AppState,
    scan_id: i64,
    patch: ScanPatch,
) -> Result<ScanRecord, String> {
    let db = &state.db;
    db.update_scan(scan_id, patch)
        .await
        .map(|(scan, _)| scan)
        .map_err(|e| e.to_string())
}
