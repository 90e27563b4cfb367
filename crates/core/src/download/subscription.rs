//! Per-job event subscription.

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use super::types::DownloadEvent;

/// Events of one job, ending with its terminal event.
///
/// Dropping the subscription (or calling `unsubscribe`) detaches it. It also
/// detaches itself after yielding the terminal event.
#[derive(Debug)]
pub struct JobSubscription {
    job_id: String,
    receiver: Option<broadcast::Receiver<DownloadEvent>>,
}

impl JobSubscription {
    pub(crate) fn new(
        job_id: String,
        receiver: Option<broadcast::Receiver<DownloadEvent>>,
    ) -> Self {
        Self { job_id, receiver }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Whether more events can still arrive.
    pub fn is_open(&self) -> bool {
        self.receiver.is_some()
    }

    /// Waits for the next event. Returns `None` once the job has finished and
    /// its terminal event was delivered, or if it finished before subscribing.
    pub async fn recv(&mut self) -> Option<DownloadEvent> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.recv().await {
                Ok(event) => {
                    if event.is_terminal() {
                        self.receiver = None;
                    }
                    return Some(event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(job_id = %self.job_id, skipped, "Job subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    /// Stops listening.
    pub fn unsubscribe(mut self) {
        self.receiver = None;
    }
}
