//! JSON envelopes shared by every route: `{"success": true, ...}` on the
//! happy path, `{"success": false, "error": "..."}` otherwise.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde::Serialize;
use serde_json::json;

use crate::db::{ScanError, ScanRecord};

pub(crate) const INVALID_SCAN_ID: &str = "Invalid scan ID";
pub(crate) const SCAN_NOT_FOUND: &str = "Scan not found";
const INTERNAL_ERROR: &str = "Internal server error";

#[derive(Debug)]
pub enum ApiError {
    InvalidId,
    NotFound,
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidId | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::InvalidId => INVALID_SCAN_ID,
            ApiError::NotFound => SCAN_NOT_FOUND,
            ApiError::BadRequest(msg) => msg.as_str(),
            ApiError::Internal(_) => INTERNAL_ERROR,
        }
    }
}

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::NotFound(_) => ApiError::NotFound,
            ScanError::Invalid(msg) => ApiError::BadRequest(msg),
            ScanError::Storage(err) => ApiError::Internal(format!("{err:#}")),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(cause) = &self {
            error!("request failed: {cause}");
        }
        let body = Json(json!({"success": false, "error": self.message()}));
        (self.status(), body).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ScanListResponse {
    pub success: bool,
    pub scans: Vec<ScanRecord>,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub scan: ScanRecord,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub success: bool,
    pub message: &'static str,
    pub deleted_id: i64,
    pub changes: usize,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub message: &'static str,
    pub scan: ScanRecord,
    pub changes: usize,
}
