//! Page scoring service boundary.

use async_trait::async_trait;

use crate::error::ServiceResult;
use crate::types::page::DiscoveredPage;

/// The external scorer that annotates discovered pages.
///
/// Returns the page set with score/category fields replaced. Pages the
/// AI model could not handle come back with their rules-based fallback
/// score and `scoring_method = rules` - a per-page degradation, never a
/// whole-call failure.
#[async_trait]
pub trait PageScorer: Send + Sync {
    async fn score(
        &self,
        pages: &[DiscoveredPage],
        competitor: &str,
    ) -> ServiceResult<Vec<DiscoveredPage>>;
}
