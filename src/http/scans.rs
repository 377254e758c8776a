use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::db::{NewScan, ScanPatch};
use crate::AppState;

use super::response::{ApiError, DeleteResponse, ScanListResponse, ScanResponse, UpdateResponse};

/// Ids arrive as raw path segments so a non-numeric id gets the envelope
/// instead of axum's plain-text rejection.
pub fn parse_scan_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>().map_err(|_| ApiError::InvalidId)
}

fn body_or_reject<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

pub async fn list_scans_handler(
    State(state): State<AppState>,
) -> Result<Json<ScanListResponse>, ApiError> {
    let scans = state.db.list_scans().await?;
    Ok(Json(ScanListResponse {
        success: true,
        scans,
    }))
}

pub async fn create_scan_handler(
    State(state): State<AppState>,
    payload: Result<Json<NewScan>, JsonRejection>,
) -> Result<(StatusCode, Json<ScanResponse>), ApiError> {
    let input = body_or_reject(payload)?;
    let scan = state.db.create_scan(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ScanResponse {
            success: true,
            message: Some("Scan saved successfully"),
            scan,
        }),
    ))
}

pub async fn get_scan_handler(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<ScanResponse>, ApiError> {
    let scan_id = parse_scan_id(&raw_id)?;
    let scan = state.db.get_scan(scan_id).await?.ok_or(ApiError::NotFound)?;

    Ok(Json(ScanResponse {
        success: true,
        message: None,
        scan,
    }))
}

pub async fn delete_scan_handler(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let scan_id = parse_scan_id(&raw_id)?;
    let changes = state.db.delete_scan(scan_id).await?;
    if changes == 0 {
        return Err(ApiError::NotFound);
    }

    Ok(Json(DeleteResponse {
        success: true,
        message: "Scan deleted successfully",
        deleted_id: scan_id,
        changes,
    }))
}

pub async fn update_scan_handler(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<ScanPatch>, JsonRejection>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let scan_id = parse_scan_id(&raw_id)?;
    let patch = body_or_reject(payload)?;
    let (scan, changes) = state.db.update_scan(scan_id, patch).await?;

    Ok(Json(UpdateResponse {
        success: true,
        message: "Scan updated successfully",
        scan,
        changes,
    }))
}
