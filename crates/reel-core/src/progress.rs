//! Progress reporting
//!
//! After every frame state transition the render loop publishes a full
//! snapshot of the run. Delivery goes through an unbounded channel so a slow
//! observer never stalls rendering.

use crate::types::{FrameId, FrameState, PipelineRun, RunId, RunSnapshot};
use serde::Serialize;
use tokio::sync::mpsc;

/// One frame state change plus the run as it looked right after it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Run the event belongs to
    pub run_id: RunId,
    /// Index of the frame that changed
    pub frame_index: usize,
    /// ID of the frame that changed
    pub frame_id: FrameId,
    /// State the frame entered
    pub state: FrameState,
    /// Full run snapshot
    pub snapshot: RunSnapshot,
}

/// Sender half handed to the pipeline
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    /// Reporter that drops every event
    #[inline]
    #[must_use]
    pub fn silent() -> Self {
        Self { tx: None }
    }

    /// Create reporter and the receiver observers read from
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Publish the state of `run.frames()[index]`
    pub fn frame_changed(&self, run: &PipelineRun, index: usize) {
        let Some(tx) = &self.tx else {
            return;
        };
        let Some(frame) = run.frames().get(index) else {
            return;
        };
        let event = ProgressEvent {
            run_id: run.id(),
            frame_index: index,
            frame_id: frame.id().clone(),
            state: frame.state(),
            snapshot: run.snapshot(),
        };
        if tx.send(event).is_err() {
            tracing::debug!(run_id = %run.id(), "progress receiver dropped");
        }
    }
}

impl From<mpsc::UnboundedSender<ProgressEvent>> for ProgressReporter {
    fn from(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { tx: Some(tx) }
    }
}
