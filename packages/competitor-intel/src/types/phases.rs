//! Request/response shapes for the external phase services.
//!
//! All session ids here are opaque strings issued by the external
//! services; this layer never inspects or fabricates them.

use serde::{Deserialize, Serialize};

use crate::types::entity::EntityCounts;
use crate::types::page::DiscoveredPage;

/// A URL the discovery crawl chose not to fetch, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedUrl {
    pub url: String,
    pub reason: String,
}

/// Result of the discovery crawl phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryOutcome {
    pub crawl_session_id: String,
    pub pages: Vec<DiscoveredPage>,

    #[serde(default)]
    pub skipped_urls: Vec<SkippedUrl>,

    #[serde(default)]
    pub sitemap_urls: Vec<String>,
}

/// One page's content signature from the fingerprint phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFingerprint {
    pub url: String,
    pub digest: String,
}

/// Result of the fingerprint phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintOutcome {
    pub fingerprint_session_id: String,
    pub total_processed: usize,

    #[serde(default)]
    pub fingerprints: Vec<PageFingerprint>,
}

/// Extraction run status as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionRunStatus {
    Running,
    Completed,
    Failed,
    /// Completed with partial results (some pages unprocessable)
    Degraded,
}

impl ExtractionRunStatus {
    /// Whether the run can make no further progress.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExtractionRunStatus::Running)
    }
}

/// Aggregate counters for an extraction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    #[serde(default)]
    pub pages_processed: usize,
    #[serde(default)]
    pub pages_extracted: usize,
    #[serde(default)]
    pub pages_skipped: usize,
    #[serde(default)]
    pub entities: EntityCounts,
}

/// An extraction run as seen through `extract` or the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionJob {
    pub extraction_session_id: String,
    pub status: ExtractionRunStatus,

    #[serde(default)]
    pub stats: ExtractionStats,

    /// Failure reason when `status` is `failed`
    pub error: Option<String>,
}

/// Acknowledgement of a stop request. Best-effort: `success` means the
/// service accepted the cancellation, not that work already halted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopAck {
    pub success: bool,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_status_terminality() {
        assert!(!ExtractionRunStatus::Running.is_terminal());
        assert!(ExtractionRunStatus::Completed.is_terminal());
        assert!(ExtractionRunStatus::Failed.is_terminal());
        assert!(ExtractionRunStatus::Degraded.is_terminal());
    }

    #[test]
    fn discovery_outcome_defaults_optional_lists() {
        let outcome: DiscoveryOutcome = serde_json::from_str(
            r#"{"crawl_session_id":"crawl-1","pages":[]}"#,
        )
        .unwrap();
        assert!(outcome.skipped_urls.is_empty());
        assert!(outcome.sitemap_urls.is_empty());
    }
}
