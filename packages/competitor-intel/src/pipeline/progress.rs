//! Progress stream consumer for a running extraction session.
//!
//! Reconciles two independent notification channels - the push event
//! stream and a pull-based status poll - into one coherent session
//! projection. Both channels apply their observations through the
//! session's guarded transition functions, so the first channel to
//! observe a terminal outcome wins and the other becomes a no-op.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::traits::extractor::{EventStream, ExtractionService};
use crate::types::session::PipelineSession;

/// Handle to the background task monitoring one extraction session.
///
/// The task exits on its own once the session reaches a terminal phase;
/// `cancel` tears it down early (e.g. when the user navigates away).
pub struct ProgressMonitor {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ProgressMonitor {
    /// Spawn the monitor task for an extraction session.
    ///
    /// `stream` is the push channel (pass a pending stream when the
    /// subscription could not be opened - polling alone will finish the
    /// session). `poll_interval` bounds progress staleness when push
    /// delivery stalls.
    pub fn spawn<E>(
        extractor: Arc<E>,
        extraction_session_id: String,
        stream: EventStream,
        session: watch::Sender<PipelineSession>,
        poll_interval: Duration,
    ) -> Self
    where
        E: ExtractionService + 'static,
    {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            run(
                extractor,
                extraction_session_id,
                stream,
                session,
                poll_interval,
                task_token,
            )
            .await;
        });
        Self { token, handle }
    }

    /// Stop monitoring without waiting for a terminal state.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the monitor task to exit.
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

async fn run<E: ExtractionService>(
    extractor: Arc<E>,
    extraction_session_id: String,
    mut stream: EventStream,
    session: watch::Sender<PipelineSession>,
    poll_interval: Duration,
    token: CancellationToken,
) {
    let mut stream_open = true;
    let start = tokio::time::Instant::now() + poll_interval;
    let mut poll = tokio::time::interval_at(start, poll_interval);
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                debug!(
                    extraction_session_id = %extraction_session_id,
                    "progress monitor cancelled"
                );
                break;
            }

            event = stream.next(), if stream_open => match event {
                Some(Ok(event)) => {
                    debug!(
                        extraction_session_id = %extraction_session_id,
                        event = event.name(),
                        "progress event"
                    );
                    if apply(&session, |s| s.apply_event(&event)) {
                        break;
                    }
                }
                Some(Err(error)) => {
                    // No reconnect here: the status poll is the recovery
                    // path for a broken push channel.
                    warn!(
                        extraction_session_id = %extraction_session_id,
                        error = %error,
                        "event stream failed, relying on status polling"
                    );
                    stream_open = false;
                }
                None => {
                    debug!(
                        extraction_session_id = %extraction_session_id,
                        "event stream closed"
                    );
                    stream_open = false;
                }
            },

            _ = poll.tick() => {
                match extractor.status(&extraction_session_id).await {
                    Ok(job) => {
                        if apply(&session, |s| s.apply_status(&job)) {
                            break;
                        }
                    }
                    Err(error) => {
                        warn!(
                            extraction_session_id = %extraction_session_id,
                            error = %error,
                            "status poll failed, will retry"
                        );
                    }
                }
            }
        }
    }
}

/// Run a transition against the shared session, notifying subscribers.
fn apply<R>(
    session: &watch::Sender<PipelineSession>,
    transition: impl FnOnce(&mut PipelineSession) -> R,
) -> R {
    let mut result = None;
    session.send_modify(|state| result = Some(transition(state)));
    result.expect("send_modify invokes the closure")
}
