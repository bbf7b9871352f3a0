//! Competitor Website Onboarding Pipeline
//!
//! Turns a single competitor website URL into structured, deduplicated,
//! searchable business entities by sequencing an external crawl,
//! scoring, fingerprint, and extraction service. This crate owns the
//! parts with real invariants: URL identity, duplicate detection, the
//! session state machine, push/poll progress reconciliation, and ranked
//! entity search. Fetching, scoring models, LLM extraction, and storage
//! stay behind trait boundaries.
//!
//! # Usage
//!
//! ```rust,ignore
//! use competitor_intel::{Orchestrator, PipelineConfig, StartOutcome};
//! use competitor_intel::clients::HttpPipelineClient;
//!
//! let client = HttpPipelineClient::new("https://pipeline.internal/api")?;
//! let orchestrator = Orchestrator::new(
//!     client.clone(), client.clone(), client.clone(), client.clone(), client,
//!     PipelineConfig::new(),
//! );
//!
//! match orchestrator.start("pal-robotics.com").await {
//!     StartOutcome::Discovered { pages_discovered } => {
//!         orchestrator.advance_to_scoring().await;
//!         // review pages, then continue
//!         orchestrator.advance_to_fingerprinting().await;
//!         let monitor = orchestrator.advance_to_extraction().await;
//!     }
//!     StartOutcome::Duplicate { company_name, .. } => {
//!         // route the user to the existing record
//!     }
//!     other => { /* render the rejection */ }
//! }
//! ```
//!
//! # Modules
//!
//! - [`normalize`] - URL canonicalization and validity rules
//! - [`dedup`] - duplicate-company detection
//! - [`pipeline`] - the session state machine and progress monitor
//! - [`search`] - ranked multi-entity search
//! - [`traits`] - boundaries to the external services
//! - [`clients`] - HTTP/SSE bindings for those boundaries
//! - [`testing`] - mock implementations for testing

pub mod clients;
pub mod dedup;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod search;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use dedup::{match_company, DedupMatch, MatchKind};
pub use error::{ServiceError, ServiceResult, UrlRejection};
pub use normalize::{competitor_name, normalize, registrable_domain, NormalizedUrl};
pub use pipeline::{Orchestrator, ProgressMonitor, StartOutcome};
pub use search::{EntityKind, SearchIndex, SearchResult, SearchResults};
pub use traits::{
    CompanyDirectory, CrawlService, EventStream, ExtractionService, Fingerprinter, PageScorer,
};
pub use types::config::{PipelineConfig, ScorePreference, DEFAULT_SCHEMA_VERSION};
pub use types::entity::{Company, CompanyIdentity, EntityCounts, Product, Release, Signal};
pub use types::events::ProgressEvent;
pub use types::page::{DiscoveredPage, PageCategory, ScoringMethod};
pub use types::phases::{
    DiscoveryOutcome, ExtractionJob, ExtractionRunStatus, ExtractionStats, FingerprintOutcome,
    PageFingerprint, SkippedUrl, StopAck,
};
pub use types::session::{
    Phase, PipelineSession, SessionMetrics, SessionProgress, StepsCompleted,
};
