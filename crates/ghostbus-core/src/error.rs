//! Error types shared across the Ghostbus system

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    #[error("Invalid position: lat={lat}, lon={lon}")]
    InvalidPosition { lat: f64, lon: f64 },

    #[error("Vehicle not found: {0}")]
    VehicleNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn invalid_sample(msg: impl Into<String>) -> Self {
        Self::InvalidSample(msg.into())
    }

    pub fn vehicle_not_found(id: impl Into<String>) -> Self {
        Self::VehicleNotFound(id.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
