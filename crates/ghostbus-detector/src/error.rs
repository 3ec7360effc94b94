//! Detector error types

use ghostbus_core::CoreError;
use thiserror::Error;

/// Errors produced by the detection pipeline
#[derive(Error, Debug)]
pub enum DetectorError {
    /// The sample is missing a hard-required field (vehicle_id, lat, lon)
    /// or carries an out-of-range coordinate. The sample is dropped; the
    /// pipeline continues with the next one.
    #[error("Invalid sample: {0}")]
    InvalidSample(#[from] CoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DetectorError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type DetectorResult<T> = Result<T, DetectorError>;
