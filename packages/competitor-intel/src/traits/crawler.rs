//! Discovery crawl service boundary.

use async_trait::async_trait;

use crate::error::ServiceResult;
use crate::normalize::NormalizedUrl;
use crate::types::phases::{DiscoveryOutcome, StopAck};

/// The external crawler that discovers a competitor site's pages.
///
/// Page fetching, sitemap parsing, and HTML handling all live behind
/// this boundary; the orchestrator only sequences the calls.
#[async_trait]
pub trait CrawlService: Send + Sync {
    /// Run the discovery crawl for a validated site.
    async fn discover(&self, url: &NormalizedUrl) -> ServiceResult<DiscoveryOutcome>;

    /// Probe that the site answers at all. Runs before any phase starts;
    /// a failure here means the pipeline never begins.
    async fn check_reachable(&self, url: &NormalizedUrl) -> ServiceResult<()>;

    /// Ask the service to cancel whatever work the given session id
    /// covers. Best-effort: callers do not wait on the work halting.
    async fn stop(&self, session_id: &str) -> ServiceResult<StopAck>;
}
