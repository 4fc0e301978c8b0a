//! Consumer-side step listener

use crate::event::{StepEvent, StepEventSender};

/// Receives step events from the orchestrator
///
/// Events are delivered outside the session lock, so a listener may call back
/// into the orchestrator (e.g. to submit a PIN).
pub trait StepListener: Send + Sync {
    /// Handle a step event
    fn on_step(&self, event: StepEvent);
}

impl<F> StepListener for F
where
    F: Fn(StepEvent) + Send + Sync,
{
    fn on_step(&self, event: StepEvent) {
        self(event);
    }
}

impl StepListener for StepEventSender {
    fn on_step(&self, event: StepEvent) {
        if self.send(event).is_err() {
            tracing::debug!("Step receiver dropped, discarding event");
        }
    }
}
