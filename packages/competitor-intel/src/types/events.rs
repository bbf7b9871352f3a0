//! Progress events pushed by the extraction service.
//!
//! Append-only observations about one extraction session. Events never
//! mutate identity; they only feed the session's progress and metrics
//! projection.

use serde::{Deserialize, Serialize};

use crate::types::phases::ExtractionStats;
use crate::types::session::SessionMetrics;

/// One event from the extraction push channel.
///
/// The wire tag is the `event` field, snake_case, matching the event
/// names the service emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    SessionStarted {
        extraction_session_id: String,
        total_pages: Option<usize>,
    },

    PageQueued {
        url: String,
    },

    PageStarted {
        url: String,
    },

    PageExtracted {
        url: String,
        entities_found: usize,
    },

    /// Extracted data merged into an already-known entity
    PageMerged {
        url: String,
    },

    PageFailed {
        url: String,
        reason: String,
    },

    /// Snapshot of throughput counters; overwrites the previous snapshot
    Metrics {
        #[serde(flatten)]
        metrics: SessionMetrics,
    },

    SessionCompleted {
        stats: ExtractionStats,
    },

    /// Late final notification some service versions emit after
    /// `session_completed`; carries the same terminal payload
    SessionFinished {
        stats: ExtractionStats,
    },

    Error {
        message: String,
    },
}

impl ProgressEvent {
    /// The wire name of this event (for logging).
    pub fn name(&self) -> &'static str {
        match self {
            ProgressEvent::SessionStarted { .. } => "session_started",
            ProgressEvent::PageQueued { .. } => "page_queued",
            ProgressEvent::PageStarted { .. } => "page_started",
            ProgressEvent::PageExtracted { .. } => "page_extracted",
            ProgressEvent::PageMerged { .. } => "page_merged",
            ProgressEvent::PageFailed { .. } => "page_failed",
            ProgressEvent::Metrics { .. } => "metrics",
            ProgressEvent::SessionCompleted { .. } => "session_completed",
            ProgressEvent::SessionFinished { .. } => "session_finished",
            ProgressEvent::Error { .. } => "error",
        }
    }

    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::SessionCompleted { .. }
                | ProgressEvent::SessionFinished { .. }
                | ProgressEvent::Error { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_deserialize_from_wire_names() {
        let event: ProgressEvent = serde_json::from_str(
            r#"{"event":"page_extracted","url":"https://acme.com/p","entities_found":3}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ProgressEvent::PageExtracted {
                url: "https://acme.com/p".to_string(),
                entities_found: 3,
            }
        );
        assert_eq!(event.name(), "page_extracted");
    }

    #[test]
    fn metrics_payload_is_flattened() {
        let event: ProgressEvent = serde_json::from_str(
            r#"{"event":"metrics","pages_per_minute":12.5,"eta_seconds":40,
                "cache_hits":7,"retries":1}"#,
        )
        .unwrap();
        let ProgressEvent::Metrics { metrics } = event else {
            panic!("expected metrics event");
        };
        assert_eq!(metrics.pages_per_minute, 12.5);
        assert_eq!(metrics.eta_seconds, Some(40));
        assert_eq!(metrics.cache_hits, 7);
    }

    #[test]
    fn terminal_events() {
        let stats = ExtractionStats::default();
        assert!(ProgressEvent::SessionCompleted { stats }.is_terminal());
        assert!(ProgressEvent::SessionFinished { stats }.is_terminal());
        assert!(ProgressEvent::Error {
            message: "boom".to_string()
        }
        .is_terminal());
        assert!(!ProgressEvent::PageQueued {
            url: "https://acme.com".to_string()
        }
        .is_terminal());
    }
}
