//! Structured-data extraction service boundary.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::{ServiceError, ServiceResult};
use crate::types::events::ProgressEvent;
use crate::types::phases::ExtractionJob;

/// Typed push channel for one extraction session.
///
/// The stream ends when the service closes it (terminal event or
/// transport failure). Consumers do not reconnect; the status poll is
/// the recovery path.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<ProgressEvent, ServiceError>> + Send>>;

/// The long-running extraction service.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    /// Start extraction over a fingerprinted page set.
    async fn start_extraction(
        &self,
        fingerprint_session_id: &str,
        competitor: &str,
        schema_version: &str,
    ) -> ServiceResult<ExtractionJob>;

    /// Pull-based status check, the fallback when push delivery stalls.
    async fn status(&self, extraction_session_id: &str) -> ServiceResult<ExtractionJob>;

    /// Open the push channel for a running extraction session.
    async fn subscribe(&self, extraction_session_id: &str) -> ServiceResult<EventStream>;
}
