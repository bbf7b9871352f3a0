//! The pipeline session - one user-initiated run from URL submission to
//! completion or failure.
//!
//! All terminal transitions funnel through [`PipelineSession::finish_extraction`]
//! and [`PipelineSession::fail`], which are guarded by a terminal-state
//! check. Both notification paths (push events and status polling) call
//! the same functions, so whichever observes completion first wins and
//! the other becomes a no-op.

use serde::{Deserialize, Serialize};

use crate::types::entity::EntityCounts;
use crate::types::events::ProgressEvent;
use crate::types::page::DiscoveredPage;
use crate::types::phases::{ExtractionJob, ExtractionRunStatus, ExtractionStats, SkippedUrl};

/// Where a session is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Discovering,
    DiscoveryComplete,
    Scoring,
    Fingerprinting,
    Extracting,
    Completed,
    Error,
}

impl Phase {
    /// Terminal phases admit no further transitions for this session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Error)
    }
}

/// Which pipeline steps have finished for this session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepsCompleted {
    pub discovery: bool,
    pub scoring: bool,
    pub fingerprinting: bool,
    pub extraction: bool,
}

/// Page and entity counters. Page counters are monotonic: event and
/// polling updates may only raise them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProgress {
    pub pages_discovered: usize,
    pub pages_processed: usize,
    pub pages_extracted: usize,
    pub pages_skipped: usize,
    pub entities: EntityCounts,
}

/// Throughput snapshot. Overwritten wholesale by each `metrics` event
/// (last-write-wins, no averaging).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    #[serde(default)]
    pub pages_per_minute: f64,
    pub eta_seconds: Option<u64>,
    #[serde(default)]
    pub cache_hits: u64,
    #[serde(default)]
    pub retries: u64,
}

/// One pipeline run, owned by the orchestrator and held only in memory.
///
/// The external services own the durable session records; this struct
/// keeps their ids plus the local projection of progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSession {
    pub phase: Phase,
    pub competitor_name: String,

    pub crawl_session_id: Option<String>,
    pub fingerprint_session_id: Option<String>,
    pub extraction_session_id: Option<String>,

    pub steps_completed: StepsCompleted,
    pub progress: SessionProgress,
    pub metrics: SessionMetrics,

    /// Pages found by discovery, re-annotated by the scorer
    pub pages: Vec<DiscoveredPage>,
    /// Discovery diagnostics: URLs the crawl chose to skip
    pub skipped_urls: Vec<SkippedUrl>,

    pub error: Option<String>,
}

impl Default for PipelineSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineSession {
    /// Create a fresh idle session.
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            competitor_name: String::new(),
            crawl_session_id: None,
            fingerprint_session_id: None,
            extraction_session_id: None,
            steps_completed: StepsCompleted::default(),
            progress: SessionProgress::default(),
            metrics: SessionMetrics::default(),
            pages: Vec::new(),
            skipped_urls: Vec::new(),
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Transition to `Error` with a reason. No-op (returns false) when the
    /// session is already terminal.
    pub fn fail(&mut self, reason: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.error = Some(reason.into());
        self.phase = Phase::Error;
        true
    }

    /// Finalize the extraction step from a terminal payload. No-op
    /// (returns false) when the session is already terminal, so a late
    /// duplicate notification cannot reopen or corrupt state.
    pub fn finish_extraction(&mut self, stats: &ExtractionStats) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.raise_page_counters(stats);
        self.progress.entities = stats.entities;
        self.steps_completed.extraction = true;
        self.phase = Phase::Completed;
        true
    }

    /// Apply one push event. Returns true once the session is terminal
    /// (including when it already was).
    pub fn apply_event(&mut self, event: &ProgressEvent) -> bool {
        if self.is_terminal() {
            return true;
        }
        match event {
            ProgressEvent::SessionStarted { .. }
            | ProgressEvent::PageQueued { .. }
            | ProgressEvent::PageStarted { .. } => {}
            ProgressEvent::PageExtracted { .. } => {
                self.progress.pages_extracted += 1;
            }
            ProgressEvent::PageMerged { .. } => {
                self.progress.pages_extracted += 1;
            }
            ProgressEvent::PageFailed { url, reason } => {
                tracing::debug!(url = %url, reason = %reason, "extraction skipped page");
                self.progress.pages_skipped += 1;
            }
            ProgressEvent::Metrics { metrics } => {
                self.metrics = metrics.clone();
            }
            ProgressEvent::SessionCompleted { stats }
            | ProgressEvent::SessionFinished { stats } => {
                self.finish_extraction(stats);
            }
            ProgressEvent::Error { message } => {
                self.fail(message.clone());
            }
        }
        self.is_terminal()
    }

    /// Apply one polled status. Returns true once the session is terminal
    /// (including when it already was).
    pub fn apply_status(&mut self, job: &ExtractionJob) -> bool {
        if self.is_terminal() {
            return true;
        }
        match job.status {
            ExtractionRunStatus::Running => {
                self.raise_page_counters(&job.stats);
            }
            ExtractionRunStatus::Completed => {
                self.finish_extraction(&job.stats);
            }
            ExtractionRunStatus::Degraded => {
                tracing::warn!(
                    extraction_session_id = %job.extraction_session_id,
                    "extraction finished degraded, finalizing partial results"
                );
                self.finish_extraction(&job.stats);
            }
            ExtractionRunStatus::Failed => {
                let reason = job
                    .error
                    .clone()
                    .unwrap_or_else(|| "extraction failed".to_string());
                self.fail(reason);
            }
        }
        self.is_terminal()
    }

    /// Raise the monotonic page counters toward the service's view.
    fn raise_page_counters(&mut self, stats: &ExtractionStats) {
        let progress = &mut self.progress;
        progress.pages_processed = progress.pages_processed.max(stats.pages_processed);
        progress.pages_extracted = progress.pages_extracted.max(stats.pages_extracted);
        progress.pages_skipped = progress.pages_skipped.max(stats.pages_skipped);
    }
}
