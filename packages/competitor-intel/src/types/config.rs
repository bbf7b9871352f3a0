//! Pipeline configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Schema version tag sent with every extraction request.
pub const DEFAULT_SCHEMA_VERSION: &str = "2024-10";

/// Which scoring method wins when AI and rules scores tie.
///
/// Product intent is not settled on this (see DESIGN.md), so it is a
/// policy knob rather than a hard-coded precedence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorePreference {
    #[default]
    PreferAi,
    PreferRules,
}

/// Tunable settings for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Interval for the pull-based extraction status check. Bounds the
    /// maximum staleness of progress when push events are not arriving.
    pub poll_interval: Duration,

    /// Schema version tag for extraction requests
    pub schema_version: String,

    /// Per-bucket result cap for the search engine
    pub search_limit: usize,

    /// AI/rules tie-break used when ranking reviewed pages
    pub score_preference: ScorePreference,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            search_limit: 5,
            score_preference: ScorePreference::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the extraction schema version tag.
    pub fn with_schema_version(mut self, version: impl Into<String>) -> Self {
        self.schema_version = version.into();
        self
    }

    /// Set the per-bucket search result cap.
    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    /// Set the AI/rules tie-break preference.
    pub fn with_score_preference(mut self, preference: ScorePreference) -> Self {
        self.score_preference = preference;
        self
    }
}
