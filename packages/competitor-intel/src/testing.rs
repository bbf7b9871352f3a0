//! Testing utilities including mock service implementations.
//!
//! These are useful for testing applications that drive the pipeline
//! without real crawler, scorer, fingerprint, or extraction backends.
//! Mocks return deterministic, configurable responses and record the
//! calls made to them for assertions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures::StreamExt;

use crate::error::{ServiceError, ServiceResult};
use crate::normalize::NormalizedUrl;
use crate::traits::{
    CompanyDirectory, CrawlService, EventStream, ExtractionService, Fingerprinter, PageScorer,
};
use crate::types::entity::CompanyIdentity;
use crate::types::events::ProgressEvent;
use crate::types::page::DiscoveredPage;
use crate::types::phases::{
    DiscoveryOutcome, ExtractionJob, ExtractionRunStatus, ExtractionStats, FingerprintOutcome,
    StopAck,
};

/// Record of a call made to the mock crawl service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlCall {
    Discover { url: String },
    CheckReachable { url: String },
    Stop { session_id: String },
}

/// A mock discovery crawler.
#[derive(Default)]
pub struct MockCrawlService {
    outcome: RwLock<Option<DiscoveryOutcome>>,
    discovery_error: RwLock<Option<String>>,
    unreachable: RwLock<Option<String>>,
    calls: Arc<RwLock<Vec<CrawlCall>>>,
}

impl MockCrawlService {
    /// Create a mock that discovers nothing and answers every probe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the discovery result.
    pub fn with_outcome(self, outcome: DiscoveryOutcome) -> Self {
        *self.outcome.write().unwrap() = Some(outcome);
        self
    }

    /// Make discovery fail with the given message.
    pub fn failing_discovery(self, message: impl Into<String>) -> Self {
        *self.discovery_error.write().unwrap() = Some(message.into());
        self
    }

    /// Make the reachability probe fail with the given message.
    pub fn unreachable(self, message: impl Into<String>) -> Self {
        *self.unreachable.write().unwrap() = Some(message.into());
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<CrawlCall> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl CrawlService for MockCrawlService {
    async fn discover(&self, url: &NormalizedUrl) -> ServiceResult<DiscoveryOutcome> {
        self.calls.write().unwrap().push(CrawlCall::Discover {
            url: url.normalized_origin.clone(),
        });

        if let Some(message) = self.discovery_error.read().unwrap().clone() {
            return Err(ServiceError::Rejected { message });
        }

        Ok(self
            .outcome
            .read()
            .unwrap()
            .clone()
            .unwrap_or_else(|| DiscoveryOutcome {
                crawl_session_id: "crawl-mock".to_string(),
                pages: vec![],
                skipped_urls: vec![],
                sitemap_urls: vec![],
            }))
    }

    async fn check_reachable(&self, url: &NormalizedUrl) -> ServiceResult<()> {
        self.calls.write().unwrap().push(CrawlCall::CheckReachable {
            url: url.normalized_origin.clone(),
        });

        match self.unreachable.read().unwrap().clone() {
            Some(message) => Err(ServiceError::Unreachable(message)),
            None => Ok(()),
        }
    }

    async fn stop(&self, session_id: &str) -> ServiceResult<StopAck> {
        self.calls.write().unwrap().push(CrawlCall::Stop {
            session_id: session_id.to_string(),
        });
        Ok(StopAck {
            success: true,
            message: None,
        })
    }
}

/// A mock page scorer.
///
/// With configured pages it returns exactly those annotations; callers
/// exercise the rules-fallback path by leaving pages out. By default it
/// echoes the input unchanged.
#[derive(Default)]
pub struct MockScorer {
    scored: RwLock<Option<Vec<DiscoveredPage>>>,
    error: RwLock<Option<String>>,
    score_calls: AtomicUsize,
}

impl MockScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pages the scorer hands back.
    pub fn with_scored_pages(self, pages: Vec<DiscoveredPage>) -> Self {
        *self.scored.write().unwrap() = Some(pages);
        self
    }

    /// Make scoring fail with the given message.
    pub fn failing(self, message: impl Into<String>) -> Self {
        *self.error.write().unwrap() = Some(message.into());
        self
    }

    /// Number of score calls made.
    pub fn score_calls(&self) -> usize {
        self.score_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageScorer for MockScorer {
    async fn score(
        &self,
        pages: &[DiscoveredPage],
        _competitor: &str,
    ) -> ServiceResult<Vec<DiscoveredPage>> {
        self.score_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.error.read().unwrap().clone() {
            return Err(ServiceError::Rejected { message });
        }

        Ok(self
            .scored
            .read()
            .unwrap()
            .clone()
            .unwrap_or_else(|| pages.to_vec()))
    }
}

/// A mock fingerprint service.
#[derive(Default)]
pub struct MockFingerprinter {
    outcome: RwLock<Option<FingerprintOutcome>>,
    error: RwLock<Option<String>>,
}

impl MockFingerprinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fingerprint result.
    pub fn with_outcome(self, outcome: FingerprintOutcome) -> Self {
        *self.outcome.write().unwrap() = Some(outcome);
        self
    }

    /// Make fingerprinting fail with the given message.
    pub fn failing(self, message: impl Into<String>) -> Self {
        *self.error.write().unwrap() = Some(message.into());
        self
    }
}

#[async_trait]
impl Fingerprinter for MockFingerprinter {
    async fn fingerprint(
        &self,
        _crawl_session_id: &str,
        _competitor: &str,
    ) -> ServiceResult<FingerprintOutcome> {
        if let Some(message) = self.error.read().unwrap().clone() {
            return Err(ServiceError::Rejected { message });
        }

        Ok(self
            .outcome
            .read()
            .unwrap()
            .clone()
            .unwrap_or_else(|| FingerprintOutcome {
                fingerprint_session_id: "fp-mock".to_string(),
                total_processed: 0,
                fingerprints: vec![],
            }))
    }
}

/// A mock extraction service.
///
/// `with_statuses` configures the successive answers to status polls
/// (the last one repeats); `with_events` configures the push stream,
/// which is consumed by the first subscription.
#[derive(Default)]
pub struct MockExtractionService {
    job: RwLock<Option<ExtractionJob>>,
    statuses: RwLock<Vec<ExtractionJob>>,
    status_index: AtomicUsize,
    events: RwLock<Option<Vec<ProgressEvent>>>,
    subscribe_error: RwLock<Option<String>>,
    extract_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl MockExtractionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the response to `start_extraction`.
    pub fn with_job(self, job: ExtractionJob) -> Self {
        *self.job.write().unwrap() = Some(job);
        self
    }

    /// Set the successive status-poll responses.
    pub fn with_statuses(self, statuses: Vec<ExtractionJob>) -> Self {
        *self.statuses.write().unwrap() = statuses;
        self
    }

    /// Set the events the push stream yields.
    pub fn with_events(self, events: Vec<ProgressEvent>) -> Self {
        *self.events.write().unwrap() = Some(events);
        self
    }

    /// Make `subscribe` fail with the given message.
    pub fn failing_subscribe(self, message: impl Into<String>) -> Self {
        *self.subscribe_error.write().unwrap() = Some(message.into());
        self
    }

    /// Number of `start_extraction` calls made.
    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    /// Number of status polls made.
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    fn running_job(extraction_session_id: &str) -> ExtractionJob {
        ExtractionJob {
            extraction_session_id: extraction_session_id.to_string(),
            status: ExtractionRunStatus::Running,
            stats: ExtractionStats::default(),
            error: None,
        }
    }
}

#[async_trait]
impl ExtractionService for MockExtractionService {
    async fn start_extraction(
        &self,
        _fingerprint_session_id: &str,
        _competitor: &str,
        _schema_version: &str,
    ) -> ServiceResult<ExtractionJob> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .job
            .read()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Self::running_job("ext-mock")))
    }

    async fn status(&self, extraction_session_id: &str) -> ServiceResult<ExtractionJob> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);

        let statuses = self.statuses.read().unwrap();
        if statuses.is_empty() {
            return Ok(Self::running_job(extraction_session_id));
        }

        let index = self
            .status_index
            .fetch_add(1, Ordering::SeqCst)
            .min(statuses.len() - 1);
        Ok(statuses[index].clone())
    }

    async fn subscribe(&self, _extraction_session_id: &str) -> ServiceResult<EventStream> {
        if let Some(message) = self.subscribe_error.read().unwrap().clone() {
            return Err(ServiceError::Stream(message));
        }

        let events = self.events.write().unwrap().take().unwrap_or_default();
        Ok(futures::stream::iter(events.into_iter().map(Ok)).boxed())
    }
}

/// A mock company directory.
#[derive(Default)]
pub struct MockDirectory {
    companies: RwLock<Vec<CompanyIdentity>>,
    error: RwLock<Option<String>>,
    snapshot_calls: AtomicUsize,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an existing company to the snapshot.
    pub fn with_company(self, company: CompanyIdentity) -> Self {
        self.companies.write().unwrap().push(company);
        self
    }

    /// Make the snapshot fetch fail with the given message.
    pub fn failing(self, message: impl Into<String>) -> Self {
        *self.error.write().unwrap() = Some(message.into());
        self
    }

    /// Number of snapshot fetches made.
    pub fn snapshot_calls(&self) -> usize {
        self.snapshot_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompanyDirectory for MockDirectory {
    async fn companies(&self) -> ServiceResult<Vec<CompanyIdentity>> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.error.read().unwrap().clone() {
            return Err(ServiceError::Rejected { message });
        }

        Ok(self.companies.read().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    #[tokio::test]
    async fn mock_crawler_records_calls() {
        let crawler = MockCrawlService::new();
        let url = normalize("initech.com").unwrap();

        crawler.check_reachable(&url).await.unwrap();
        crawler.discover(&url).await.unwrap();
        crawler.stop("crawl-1").await.unwrap();

        let calls = crawler.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[2],
            CrawlCall::Stop {
                session_id: "crawl-1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn mock_scorer_echoes_input_by_default() {
        let scorer = MockScorer::new();
        let pages = vec![DiscoveredPage::new("https://initech.com/", 30.0)];

        let scored = scorer.score(&pages, "Initech").await.unwrap();
        assert_eq!(scored.len(), 1);
        assert_eq!(scorer.score_calls(), 1);
    }

    #[tokio::test]
    async fn mock_extractor_status_sequence_repeats_last() {
        let extractor = MockExtractionService::new().with_statuses(vec![
            MockExtractionService::running_job("ext-1"),
            ExtractionJob {
                extraction_session_id: "ext-1".to_string(),
                status: ExtractionRunStatus::Completed,
                stats: ExtractionStats::default(),
                error: None,
            },
        ]);

        assert_eq!(
            extractor.status("ext-1").await.unwrap().status,
            ExtractionRunStatus::Running
        );
        assert_eq!(
            extractor.status("ext-1").await.unwrap().status,
            ExtractionRunStatus::Completed
        );
        assert_eq!(
            extractor.status("ext-1").await.unwrap().status,
            ExtractionRunStatus::Completed
        );
    }

    #[tokio::test]
    async fn mock_extractor_stream_is_consumed_once() {
        let extractor = MockExtractionService::new().with_events(vec![ProgressEvent::PageQueued {
            url: "https://initech.com/".to_string(),
        }]);

        let first = extractor.subscribe("ext-1").await.unwrap();
        assert_eq!(first.collect::<Vec<_>>().await.len(), 1);

        let second = extractor.subscribe("ext-1").await.unwrap();
        assert_eq!(second.collect::<Vec<_>>().await.len(), 0);
    }
}
