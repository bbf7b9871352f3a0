//! The pipeline session state machine.
//!
//! Sequences the four external phases (discovery, scoring,
//! fingerprinting, extraction) for one competitor URL, owning the
//! session's progress and metrics state. Phases are strictly
//! sequential; out-of-order or repeated advances are no-ops rather
//! than reorderings.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dedup::{match_company, DedupMatch, MatchKind};
use crate::error::UrlRejection;
use crate::normalize::{competitor_name, normalize};
use crate::pipeline::progress::ProgressMonitor;
use crate::traits::{
    CompanyDirectory, CrawlService, ExtractionService, Fingerprinter, PageScorer,
};
use crate::types::config::PipelineConfig;
use crate::types::page::{rank_pages, ScoringMethod};
use crate::types::session::{Phase, PipelineSession};

/// What happened when a URL was submitted.
///
/// Validation and dedup outcomes are values, not errors: callers render
/// them as guidance. Only `Failed` leaves the session in `Error`.
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// The URL failed a validation rule; nothing was started
    Rejected(UrlRejection),

    /// The site did not answer the reachability probe; nothing was started
    Unreachable { reason: String },

    /// The identity already belongs to a known company. A terminal
    /// short-circuit: proceeding would create a duplicate, so the caller
    /// must route the user to the existing record instead.
    Duplicate {
        company_id: Uuid,
        company_name: String,
        matched_by: MatchKind,
    },

    /// Discovery ran; the session is reviewable in `DiscoveryComplete`
    Discovered { pages_discovered: usize },

    /// A pre-phase or discovery call failed; the session is in `Error`
    Failed { reason: String },

    /// The session already left `Idle`; nothing was done
    AlreadyStarted,
}

/// Drives one pipeline session against the external services.
///
/// One orchestrator owns one session; independent runs get independent
/// orchestrators and share nothing. Front ends observe the session
/// through [`Orchestrator::subscribe`] - rendering never reaches into
/// the transition logic.
pub struct Orchestrator<C, S, F, E, D> {
    crawler: Arc<C>,
    scorer: Arc<S>,
    fingerprinter: Arc<F>,
    extractor: Arc<E>,
    directory: Arc<D>,
    config: PipelineConfig,
    session: watch::Sender<PipelineSession>,
}

impl<C, S, F, E, D> Orchestrator<C, S, F, E, D>
where
    C: CrawlService + 'static,
    S: PageScorer,
    F: Fingerprinter,
    E: ExtractionService + 'static,
    D: CompanyDirectory,
{
    /// Create an orchestrator with a fresh idle session.
    pub fn new(
        crawler: C,
        scorer: S,
        fingerprinter: F,
        extractor: E,
        directory: D,
        config: PipelineConfig,
    ) -> Self {
        let (session, _) = watch::channel(PipelineSession::new());
        Self {
            crawler: Arc::new(crawler),
            scorer: Arc::new(scorer),
            fingerprinter: Arc::new(fingerprinter),
            extractor: Arc::new(extractor),
            directory: Arc::new(directory),
            config,
            session,
        }
    }

    /// Subscribe to session changes.
    pub fn subscribe(&self) -> watch::Receiver<PipelineSession> {
        self.session.subscribe()
    }

    /// Current session state.
    pub fn snapshot(&self) -> PipelineSession {
        self.session.borrow().clone()
    }

    /// Validate, dedup-check, and run the discovery phase for a raw URL.
    pub async fn start(&self, raw_url: &str) -> StartOutcome {
        if self.snapshot().phase != Phase::Idle {
            return StartOutcome::AlreadyStarted;
        }

        let normalized = match normalize(raw_url) {
            Ok(normalized) => normalized,
            Err(rejection) => {
                info!(url = %raw_url, reason = %rejection, "rejected URL");
                return StartOutcome::Rejected(rejection);
            }
        };

        if let Err(error) = self.crawler.check_reachable(&normalized).await {
            info!(origin = %normalized.normalized_origin, error = %error, "site unreachable");
            return StartOutcome::Unreachable {
                reason: error.to_string(),
            };
        }

        // Fresh snapshot per check; the directory is never cached here.
        let existing = match self.directory.companies().await {
            Ok(existing) => existing,
            Err(error) => {
                let reason = error.to_string();
                self.update(|s| s.fail(reason.clone()));
                return StartOutcome::Failed { reason };
            }
        };

        let name = competitor_name(&normalized.etld1);
        if let DedupMatch::Duplicate {
            company_id,
            company_name,
            matched_by,
        } = match_company(&normalized.etld1, &name, &existing)
        {
            info!(
                etld1 = %normalized.etld1,
                existing = %company_name,
                "duplicate company, not starting pipeline"
            );
            return StartOutcome::Duplicate {
                company_id,
                company_name,
                matched_by,
            };
        }

        self.update(|s| {
            s.competitor_name = name.clone();
            s.phase = Phase::Discovering;
        });
        info!(origin = %normalized.normalized_origin, competitor = %name, "starting discovery");

        match self.crawler.discover(&normalized).await {
            Ok(outcome) => {
                let pages_discovered = outcome.pages.len();
                info!(
                    crawl_session_id = %outcome.crawl_session_id,
                    pages_discovered,
                    skipped = outcome.skipped_urls.len(),
                    "discovery complete"
                );
                self.update(|s| {
                    s.crawl_session_id = Some(outcome.crawl_session_id);
                    s.progress.pages_discovered = pages_discovered;
                    s.pages = outcome.pages;
                    s.skipped_urls = outcome.skipped_urls;
                    s.steps_completed.discovery = true;
                    s.phase = Phase::DiscoveryComplete;
                });
                StartOutcome::Discovered { pages_discovered }
            }
            Err(error) => {
                // Upstream reason passes through verbatim.
                let reason = error.to_string();
                self.update(|s| s.fail(reason.clone()));
                StartOutcome::Failed { reason }
            }
        }
    }

    /// Send the discovered pages to the scorer. Valid only from
    /// `DiscoveryComplete`; otherwise a no-op returning the current phase.
    pub async fn advance_to_scoring(&self) -> Phase {
        let snapshot = self.snapshot();
        if snapshot.phase != Phase::DiscoveryComplete {
            warn!(phase = ?snapshot.phase, "advance_to_scoring out of order, ignoring");
            return snapshot.phase;
        }

        self.update(|s| s.phase = Phase::Scoring);

        match self
            .scorer
            .score(&snapshot.pages, &snapshot.competitor_name)
            .await
        {
            Ok(scored) => self.update(|s| {
                for page in &mut s.pages {
                    if let Some(annotated) = scored.iter().find(|p| p.url == page.url) {
                        page.merge_scoring(annotated);
                    }
                    // Pages the scorer returned nothing for keep their
                    // rules-based score: a per-page degradation, never a
                    // session failure.
                }
                rank_pages(&mut s.pages, self.config.score_preference);
                s.steps_completed.scoring = true;

                let ai_scored = s
                    .pages
                    .iter()
                    .filter(|p| p.scoring_method == ScoringMethod::Ai)
                    .count();
                info!(
                    ai_scored,
                    rules_scored = s.pages.len() - ai_scored,
                    "scoring complete, awaiting review"
                );
                s.phase
            }),
            Err(error) => self.update(|s| {
                s.fail(error.to_string());
                s.phase
            }),
        }
    }

    /// Run the fingerprint phase for the finished crawl. Requires a
    /// completed scoring step and a crawl session id; otherwise a no-op.
    pub async fn advance_to_fingerprinting(&self) -> Phase {
        let snapshot = self.snapshot();
        let Some(crawl_session_id) = snapshot
            .crawl_session_id
            .clone()
            .filter(|_| snapshot.phase == Phase::Scoring && snapshot.steps_completed.scoring)
        else {
            warn!(phase = ?snapshot.phase, "advance_to_fingerprinting out of order, ignoring");
            return snapshot.phase;
        };

        self.update(|s| s.phase = Phase::Fingerprinting);

        match self
            .fingerprinter
            .fingerprint(&crawl_session_id, &snapshot.competitor_name)
            .await
        {
            Ok(outcome) => self.update(|s| {
                info!(
                    fingerprint_session_id = %outcome.fingerprint_session_id,
                    pages_processed = outcome.total_processed,
                    "fingerprinting complete"
                );
                s.fingerprint_session_id = Some(outcome.fingerprint_session_id);
                s.progress.pages_processed = outcome.total_processed;
                s.steps_completed.fingerprinting = true;
                s.phase = Phase::Extracting;
                s.phase
            }),
            Err(error) => self.update(|s| {
                s.fail(error.to_string());
                s.phase
            }),
        }
    }

    /// Issue the extraction request and hand the session to the progress
    /// monitor. Valid from `Extracting` before an extraction session
    /// exists; otherwise a no-op returning `None` with no external call.
    pub async fn advance_to_extraction(&self) -> Option<ProgressMonitor> {
        let snapshot = self.snapshot();
        let Some(fingerprint_session_id) = snapshot
            .fingerprint_session_id
            .clone()
            .filter(|_| snapshot.phase == Phase::Extracting)
        else {
            warn!(phase = ?snapshot.phase, "advance_to_extraction out of order, ignoring");
            return None;
        };
        if snapshot.extraction_session_id.is_some() {
            warn!("extraction already requested, ignoring");
            return None;
        }

        let job = match self
            .extractor
            .start_extraction(
                &fingerprint_session_id,
                &snapshot.competitor_name,
                &self.config.schema_version,
            )
            .await
        {
            Ok(job) => job,
            Err(error) => {
                self.update(|s| s.fail(error.to_string()));
                return None;
            }
        };

        let extraction_session_id = job.extraction_session_id.clone();
        info!(
            extraction_session_id = %extraction_session_id,
            schema_version = %self.config.schema_version,
            "extraction started"
        );
        let terminal = self.update(|s| {
            s.extraction_session_id = Some(extraction_session_id.clone());
            s.apply_status(&job)
        });
        if terminal {
            // The service answered with an already-terminal job; there
            // is nothing left to monitor.
            return None;
        }

        let stream = match self.extractor.subscribe(&extraction_session_id).await {
            Ok(stream) => stream,
            Err(error) => {
                // No retry for the push channel; the monitor's polling
                // will still carry the session to a terminal state.
                warn!(
                    extraction_session_id = %extraction_session_id,
                    error = %error,
                    "event stream unavailable, monitoring via polling only"
                );
                Box::pin(futures::stream::pending())
            }
        };

        Some(ProgressMonitor::spawn(
            Arc::clone(&self.extractor),
            extraction_session_id,
            stream,
            self.session.clone(),
            self.config.poll_interval,
        ))
    }

    /// Cancel the active phase. Valid from `Discovering`,
    /// `Fingerprinting`, or `Extracting`; otherwise a no-op.
    ///
    /// The remote cancellation is fire-and-forget - the external service
    /// is told to stop, but the session transitions locally regardless so
    /// no caller blocks on confirmation.
    pub async fn stop(&self) -> Phase {
        let snapshot = self.snapshot();
        if !matches!(
            snapshot.phase,
            Phase::Discovering | Phase::Fingerprinting | Phase::Extracting
        ) {
            return snapshot.phase;
        }

        let active_id = snapshot
            .extraction_session_id
            .or(snapshot.fingerprint_session_id)
            .or(snapshot.crawl_session_id);

        if let Some(session_id) = active_id {
            let crawler = Arc::clone(&self.crawler);
            tokio::spawn(async move {
                match crawler.stop(&session_id).await {
                    Ok(ack) => info!(
                        session_id = %session_id,
                        success = ack.success,
                        "stop acknowledged"
                    ),
                    Err(error) => warn!(
                        session_id = %session_id,
                        error = %error,
                        "stop request failed"
                    ),
                }
            });
        }

        self.update(|s| {
            s.fail("cancelled by user");
            s.phase
        })
    }

    /// Run a transition against the session, notifying subscribers.
    fn update<R>(&self, transition: impl FnOnce(&mut PipelineSession) -> R) -> R {
        let mut result = None;
        self.session.send_modify(|state| result = Some(transition(state)));
        result.expect("send_modify invokes the closure")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::testing::{
        CrawlCall, MockCrawlService, MockDirectory, MockExtractionService, MockFingerprinter,
        MockScorer,
    };
    use crate::types::entity::{CompanyIdentity, EntityCounts};
    use crate::types::events::ProgressEvent;
    use crate::types::page::{DiscoveredPage, PageCategory};
    use crate::types::phases::{
        DiscoveryOutcome, ExtractionJob, ExtractionRunStatus, ExtractionStats, FingerprintOutcome,
        SkippedUrl,
    };

    type TestOrchestrator = Orchestrator<
        MockCrawlService,
        MockScorer,
        MockFingerprinter,
        MockExtractionService,
        MockDirectory,
    >;

    fn discovery_outcome() -> DiscoveryOutcome {
        DiscoveryOutcome {
            crawl_session_id: "crawl-1".to_string(),
            pages: vec![
                DiscoveredPage::new("https://initech.com/", 50.0),
                DiscoveredPage::new("https://initech.com/pricing", 55.0),
            ],
            skipped_urls: vec![SkippedUrl {
                url: "https://initech.com/login".to_string(),
                reason: "auth wall".to_string(),
            }],
            sitemap_urls: vec![],
        }
    }

    fn completed_job(status: ExtractionRunStatus) -> ExtractionJob {
        ExtractionJob {
            extraction_session_id: "ext-1".to_string(),
            status,
            stats: ExtractionStats {
                pages_processed: 2,
                pages_extracted: 2,
                pages_skipped: 0,
                entities: EntityCounts {
                    companies: 1,
                    products: 3,
                    ..Default::default()
                },
            },
            error: None,
        }
    }

    fn orchestrator(
        crawler: MockCrawlService,
        scorer: MockScorer,
        extractor: MockExtractionService,
        directory: MockDirectory,
    ) -> TestOrchestrator {
        Orchestrator::new(
            crawler,
            scorer,
            MockFingerprinter::new().with_outcome(FingerprintOutcome {
                fingerprint_session_id: "fp-1".to_string(),
                total_processed: 2,
                fingerprints: vec![],
            }),
            extractor,
            directory,
            PipelineConfig::new().with_poll_interval(Duration::from_millis(10)),
        )
    }

    fn happy_path_orchestrator() -> TestOrchestrator {
        let extractor = MockExtractionService::new()
            .with_job(ExtractionJob {
                extraction_session_id: "ext-1".to_string(),
                status: ExtractionRunStatus::Running,
                stats: ExtractionStats::default(),
                error: None,
            })
            .with_events(vec![ProgressEvent::SessionCompleted {
                stats: completed_job(ExtractionRunStatus::Completed).stats,
            }]);
        orchestrator(
            MockCrawlService::new().with_outcome(discovery_outcome()),
            MockScorer::new(),
            extractor,
            MockDirectory::new(),
        )
    }

    #[tokio::test]
    async fn full_pipeline_reaches_completed() {
        let orchestrator = happy_path_orchestrator();

        let outcome = orchestrator.start("initech.com").await;
        assert_eq!(outcome, StartOutcome::Discovered { pages_discovered: 2 });
        let session = orchestrator.snapshot();
        assert_eq!(session.phase, Phase::DiscoveryComplete);
        assert_eq!(session.competitor_name, "Initech");
        assert_eq!(session.crawl_session_id.as_deref(), Some("crawl-1"));
        assert_eq!(session.skipped_urls.len(), 1);

        assert_eq!(orchestrator.advance_to_scoring().await, Phase::Scoring);
        assert!(orchestrator.snapshot().steps_completed.scoring);

        assert_eq!(
            orchestrator.advance_to_fingerprinting().await,
            Phase::Extracting
        );
        let session = orchestrator.snapshot();
        assert_eq!(session.fingerprint_session_id.as_deref(), Some("fp-1"));
        assert_eq!(session.progress.pages_processed, 2);

        let monitor = orchestrator
            .advance_to_extraction()
            .await
            .expect("monitor spawned");
        tokio::time::timeout(Duration::from_secs(5), monitor.join())
            .await
            .expect("extraction completes");

        let session = orchestrator.snapshot();
        assert_eq!(session.phase, Phase::Completed);
        assert!(session.steps_completed.extraction);
        assert_eq!(session.progress.entities.products, 3);
    }

    #[tokio::test]
    async fn invalid_url_is_rejected_before_any_call() {
        let crawler = MockCrawlService::new();
        let orchestrator = orchestrator(
            crawler,
            MockScorer::new(),
            MockExtractionService::new(),
            MockDirectory::new(),
        );

        let outcome = orchestrator.start("http://10.0.0.5").await;
        assert!(matches!(
            outcome,
            StartOutcome::Rejected(UrlRejection::PrivateOrLocalAddress(_))
        ));
        assert_eq!(orchestrator.snapshot().phase, Phase::Idle);
    }

    #[tokio::test]
    async fn unreachable_site_never_starts_the_pipeline() {
        let orchestrator = orchestrator(
            MockCrawlService::new().unreachable("connection refused"),
            MockScorer::new(),
            MockExtractionService::new(),
            MockDirectory::new(),
        );

        let outcome = orchestrator.start("initech.com").await;
        assert!(matches!(outcome, StartOutcome::Unreachable { .. }));
        assert_eq!(orchestrator.snapshot().phase, Phase::Idle);
    }

    #[tokio::test]
    async fn duplicate_company_short_circuits_before_discovery() {
        let existing = CompanyIdentity {
            id: Uuid::new_v4(),
            name: "Initech".to_string(),
            website: Some("https://www.initech.com".to_string()),
        };
        let crawler = MockCrawlService::new().with_outcome(discovery_outcome());
        let orchestrator = orchestrator(
            crawler,
            MockScorer::new(),
            MockExtractionService::new(),
            MockDirectory::new().with_company(existing.clone()),
        );

        let outcome = orchestrator.start("https://initech.com").await;
        assert_eq!(
            outcome,
            StartOutcome::Duplicate {
                company_id: existing.id,
                company_name: "Initech".to_string(),
                matched_by: MatchKind::Domain,
            }
        );
        assert_eq!(orchestrator.snapshot().phase, Phase::Idle);

        // Dedup fired before discovery: the crawler saw only the probe.
        let calls = orchestrator.crawler.calls();
        assert!(calls
            .iter()
            .all(|call| matches!(call, CrawlCall::CheckReachable { .. })));
    }

    #[tokio::test]
    async fn discovery_failure_surfaces_reason_verbatim() {
        let orchestrator = orchestrator(
            MockCrawlService::new().failing_discovery("crawler quota exhausted"),
            MockScorer::new(),
            MockExtractionService::new(),
            MockDirectory::new(),
        );

        let outcome = orchestrator.start("initech.com").await;
        assert!(
            matches!(outcome, StartOutcome::Failed { ref reason } if reason.contains("crawler quota exhausted"))
        );
        let session = orchestrator.snapshot();
        assert_eq!(session.phase, Phase::Error);
        assert!(session
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("crawler quota exhausted"));
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let orchestrator = happy_path_orchestrator();
        orchestrator.start("initech.com").await;
        assert_eq!(
            orchestrator.start("other.com").await,
            StartOutcome::AlreadyStarted
        );
    }

    #[tokio::test]
    async fn scoring_merges_ai_annotations_and_keeps_rules_fallback() {
        let scored = vec![DiscoveredPage::new("https://initech.com/pricing", 90.0)
            .with_category(PageCategory::Pricing)
            .with_ai_score(90.0, 0.93, "pricing tiers listed")];
        let orchestrator = orchestrator(
            MockCrawlService::new().with_outcome(discovery_outcome()),
            MockScorer::new().with_scored_pages(scored),
            MockExtractionService::new(),
            MockDirectory::new(),
        );

        orchestrator.start("initech.com").await;
        orchestrator.advance_to_scoring().await;

        let session = orchestrator.snapshot();
        assert_eq!(session.phase, Phase::Scoring);

        // AI-annotated page ranks first under the default preference.
        let top = &session.pages[0];
        assert_eq!(top.url, "https://initech.com/pricing");
        assert_eq!(top.scoring_method, ScoringMethod::Ai);
        assert_eq!(top.ai_confidence, Some(0.93));

        // The page the scorer skipped kept its rules score.
        let fallback = &session.pages[1];
        assert_eq!(fallback.url, "https://initech.com/");
        assert_eq!(fallback.scoring_method, ScoringMethod::Rules);
        assert_eq!(fallback.score, 50.0);
    }

    #[tokio::test]
    async fn advances_out_of_order_are_noops_with_no_external_calls() {
        let orchestrator = happy_path_orchestrator();

        // Nothing has started: every advance is a no-op.
        assert_eq!(orchestrator.advance_to_scoring().await, Phase::Idle);
        assert_eq!(orchestrator.advance_to_fingerprinting().await, Phase::Idle);
        assert!(orchestrator.advance_to_extraction().await.is_none());

        orchestrator.start("initech.com").await;

        // Extraction before fingerprinting succeeded: state unchanged,
        // no request issued.
        assert!(orchestrator.advance_to_extraction().await.is_none());
        assert_eq!(orchestrator.snapshot().phase, Phase::DiscoveryComplete);
        assert_eq!(orchestrator.extractor.extract_calls(), 0);

        // Fingerprinting before scoring: same.
        assert_eq!(
            orchestrator.advance_to_fingerprinting().await,
            Phase::DiscoveryComplete
        );
    }

    #[tokio::test]
    async fn repeated_extraction_request_is_a_noop() {
        let orchestrator = happy_path_orchestrator();
        orchestrator.start("initech.com").await;
        orchestrator.advance_to_scoring().await;
        orchestrator.advance_to_fingerprinting().await;

        let monitor = orchestrator.advance_to_extraction().await;
        assert!(monitor.is_some());
        assert!(orchestrator.advance_to_extraction().await.is_none());
        assert_eq!(orchestrator.extractor.extract_calls(), 1);

        if let Some(monitor) = monitor {
            monitor.cancel();
            monitor.join().await;
        }
    }

    #[tokio::test]
    async fn stop_cancels_remotely_and_fails_locally() {
        let orchestrator = happy_path_orchestrator();
        orchestrator.start("initech.com").await;
        orchestrator.advance_to_scoring().await;
        orchestrator.advance_to_fingerprinting().await;
        assert_eq!(orchestrator.snapshot().phase, Phase::Extracting);

        let phase = orchestrator.stop().await;
        assert_eq!(phase, Phase::Error);
        assert_eq!(
            orchestrator.snapshot().error.as_deref(),
            Some("cancelled by user")
        );

        // The fire-and-forget stop call reaches the service.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let calls = orchestrator.crawler.calls();
        assert!(calls
            .iter()
            .any(|call| matches!(call, CrawlCall::Stop { session_id } if session_id == "fp-1")));
    }

    #[tokio::test]
    async fn stop_outside_active_phases_is_a_noop() {
        let orchestrator = happy_path_orchestrator();
        assert_eq!(orchestrator.stop().await, Phase::Idle);

        orchestrator.start("initech.com").await;
        assert_eq!(orchestrator.stop().await, Phase::DiscoveryComplete);
    }

    #[tokio::test]
    async fn already_terminal_extraction_job_needs_no_monitor() {
        let extractor = MockExtractionService::new()
            .with_job(completed_job(ExtractionRunStatus::Completed));
        let orchestrator = orchestrator(
            MockCrawlService::new().with_outcome(discovery_outcome()),
            MockScorer::new(),
            extractor,
            MockDirectory::new(),
        );

        orchestrator.start("initech.com").await;
        orchestrator.advance_to_scoring().await;
        orchestrator.advance_to_fingerprinting().await;

        assert!(orchestrator.advance_to_extraction().await.is_none());
        let session = orchestrator.snapshot();
        assert_eq!(session.phase, Phase::Completed);
        assert_eq!(session.progress.entities.products, 3);
    }

    #[tokio::test]
    async fn subscribers_observe_phase_transitions() {
        let orchestrator = happy_path_orchestrator();
        let mut receiver = orchestrator.subscribe();

        orchestrator.start("initech.com").await;
        receiver
            .wait_for(|s| s.phase == Phase::DiscoveryComplete)
            .await
            .expect("subscriber sees discovery completion");
    }
}
