//! Fingerprint service boundary.

use async_trait::async_trait;

use crate::error::ServiceResult;
use crate::types::phases::FingerprintOutcome;

/// The external service that computes per-page content signatures for a
/// finished crawl session.
#[async_trait]
pub trait Fingerprinter: Send + Sync {
    async fn fingerprint(
        &self,
        crawl_session_id: &str,
        competitor: &str,
    ) -> ServiceResult<FingerprintOutcome>;
}
