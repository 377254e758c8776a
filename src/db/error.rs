//! Errors surfaced by the scan store.

use thiserror::Error;

pub type ScanResult<T> = std::result::Result<T, ScanError>;

#[derive(Error, Debug)]
pub enum ScanError {
    /// No row with this id.
    #[error("scan {0} not found")]
    NotFound(i64),

    /// Input rejected before touching storage.
    #[error("invalid scan: {0}")]
    Invalid(String),

    /// Underlying SQLite or worker-thread failure.
    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl ScanError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}
