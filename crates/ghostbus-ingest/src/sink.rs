//! Persistence collaborator interface
//!
//! Long-term storage lives outside this system; the ingest loop only
//! hands each enriched record to a sink, fire-and-forget. A sink failure
//! is logged and swallowed and never affects in-memory detection state or
//! the live broadcast.

use async_trait::async_trait;
use ghostbus_core::EnrichedRecord;
use thiserror::Error;

/// Persistence sink errors
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

impl SinkError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

/// Receives every enriched record for long-term storage
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn store(&self, record: &EnrichedRecord) -> Result<(), SinkError>;
}

/// Discards every record; used when no storage backend is configured
#[derive(Debug, Default)]
pub struct NullSink;

#[async_trait]
impl RecordSink for NullSink {
    async fn store(&self, _record: &EnrichedRecord) -> Result<(), SinkError> {
        Ok(())
    }
}
