//! Generation pipeline
//!
//! Turns a selected idea into an ordered, fully attempted frame collection:
//! 1. Storyboard generation (all-or-nothing, fatal to the run)
//! 2. Deterministic frame construction
//! 3. Strictly sequential rendering with per-frame failure containment
//! 4. Advance to review
//!
//! # Example
//!
//! ```rust,ignore
//! use reel_core::prelude::*;
//!
//! let pipeline = GenerationPipeline::new(storyboards, renderer)
//!     .with_render_timeout(Duration::from_secs(90));
//! let (progress, mut events) = ProgressReporter::channel();
//! let report = pipeline.execute(&mut run, &progress, &CancelToken::new()).await?;
//! ```

use crate::cancel::CancelToken;
use crate::error::{PipelineError, RenderError};
use crate::generators::{validate_storyboard, FrameRenderer, StoryboardGenerator};
use crate::progress::ProgressReporter;
use crate::types::{
    Frame, FrameKind, FrameState, MediaRef, Phase, PipelineRun, RunId, Storyboard,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default per-frame render deadline
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the ordered frame collection for a storyboard
///
/// `[HOOK, INGREDIENTS, STEP 1..N]`, all pending. Cannot fail.
#[must_use]
pub fn build_frames(storyboard: &Storyboard) -> Vec<Frame> {
    let mut frames = Vec::with_capacity(storyboard.frame_count());
    frames.push(Frame::new(
        "hook",
        FrameKind::Hook,
        storyboard.hook_prompt.clone(),
        "Hook: Finished Dish",
    ));
    frames.push(Frame::new(
        "ingredients",
        FrameKind::Ingredients,
        storyboard.ingredients_prompt.clone(),
        "Ingredients Laydown",
    ));
    for (i, step) in storyboard.steps.iter().enumerate() {
        frames.push(Frame::new(
            format!("step-{}", i + 1),
            FrameKind::Step,
            step.prompt.clone(),
            format!("Step {}: {}", i + 1, step.description),
        ));
    }
    frames
}

/// Summary of a run that reached review
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Run ID
    pub run_id: RunId,
    /// Frames attempted
    pub total: usize,
    /// Frames completed
    pub completed: usize,
    /// Frames failed
    pub failed: usize,
    /// Completed frames carrying a placeholder
    pub placeholders: usize,
    /// Wall time for storyboard plus rendering
    pub elapsed_ms: u64,
}

impl RunReport {
    fn from_run(run: &PipelineRun, elapsed: Duration) -> Self {
        Self {
            run_id: run.id(),
            total: run.frames().len(),
            completed: run.count(FrameState::Completed),
            failed: run.count(FrameState::Failed),
            placeholders: run
                .frames()
                .iter()
                .filter(|f| f.media_ref().is_some_and(MediaRef::is_placeholder))
                .count(),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Whether every frame completed
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.completed == self.total
    }
}

/// Sequential storyboard-and-render orchestrator
pub struct GenerationPipeline {
    storyboards: Arc<dyn StoryboardGenerator>,
    renderer: Arc<dyn FrameRenderer>,
    render_timeout: Duration,
}

impl GenerationPipeline {
    /// Create pipeline with the default render timeout
    pub fn new(
        storyboards: Arc<dyn StoryboardGenerator>,
        renderer: Arc<dyn FrameRenderer>,
    ) -> Self {
        Self {
            storyboards,
            renderer,
            render_timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }

    /// With per-frame render deadline
    #[inline]
    #[must_use]
    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = timeout;
        self
    }

    /// Per-frame render deadline
    #[inline]
    #[must_use]
    pub fn render_timeout(&self) -> Duration {
        self.render_timeout
    }

    /// Execute the pipeline on a run in `SELECTION` with an idea selected
    ///
    /// # Errors
    /// - `WrongPhase` / `NoIdeaSelected` if the run is not ready
    /// - `StoryboardFailed` if the storyboard is missing or malformed; no
    ///   frames are built and the phase stays `SELECTION`
    /// - `Cancelled` if the token fires; attempted frames keep their state,
    ///   the rest stay `PENDING`
    ///
    /// Individual frame failures are never errors: the run reaches `REVIEW`
    /// however many frames failed.
    #[tracing::instrument(skip_all, fields(run_id = %run.id()))]
    pub async fn execute(
        &self,
        run: &mut PipelineRun,
        progress: &ProgressReporter,
        cancel: &CancelToken,
    ) -> Result<RunReport, PipelineError> {
        if run.phase() != Phase::Selection {
            return Err(PipelineError::WrongPhase {
                expected: Phase::Selection,
                actual: run.phase(),
            });
        }
        let idea = run
            .selected_idea()
            .cloned()
            .ok_or(PipelineError::NoIdeaSelected)?;
        let start = Instant::now();

        tracing::info!(idea = %idea.title, storyboard = self.storyboards.name(), "drafting storyboard");
        let storyboard = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::info!("cancelled during storyboard generation");
                return Err(PipelineError::Cancelled { attempted: 0, total: 0 });
            }
            result = self.storyboards.generate_storyboard(&idea) => result,
        };
        let storyboard = match storyboard.and_then(|s| validate_storyboard(&s).map(|()| s)) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "storyboard generation failed, aborting run");
                return Err(PipelineError::StoryboardFailed(e));
            }
        };

        let frames = build_frames(&storyboard);
        tracing::info!(frames = frames.len(), "storyboard ready");
        run.begin_generation(frames)?;

        self.render_all(run, progress, cancel).await?;

        run.advance_to(Phase::Review)?;
        let report = RunReport::from_run(run, start.elapsed());
        tracing::info!(
            completed = report.completed,
            failed = report.failed,
            total = report.total,
            elapsed_ms = report.elapsed_ms,
            "run reached review"
        );
        Ok(report)
    }

    /// Render every frame in order, one at a time
    async fn render_all(
        &self,
        run: &mut PipelineRun,
        progress: &ProgressReporter,
        cancel: &CancelToken,
    ) -> Result<(), PipelineError> {
        let total = run.frames().len();

        for index in 0..total {
            if cancel.is_cancelled() {
                tracing::info!(attempted = index, total, "run cancelled between frames");
                return Err(PipelineError::Cancelled {
                    attempted: index,
                    total,
                });
            }

            let prompt = {
                let Some(frame) = run.frame_mut(index) else {
                    break;
                };
                frame.begin()?;
                tracing::debug!(frame = %frame.id(), kind = %frame.kind(), "frame generating");
                frame.prompt().to_owned()
            };
            progress.frame_changed(run, index);

            let outcome = self.render_frame(&prompt, cancel).await;
            let was_cancelled = matches!(outcome, Err(RenderError::Cancelled));

            if let Some(frame) = run.frame_mut(index) {
                match outcome {
                    Ok(media) => {
                        tracing::debug!(frame = %frame.id(), placeholder = media.is_placeholder(), "frame completed");
                        frame.complete(media)?;
                    }
                    Err(e) => {
                        tracing::warn!(frame = %frame.id(), error = %e, "frame failed");
                        frame.fail(e.to_string())?;
                    }
                }
            }
            progress.frame_changed(run, index);

            if was_cancelled {
                tracing::info!(attempted = index + 1, total, "run cancelled during render");
                return Err(PipelineError::Cancelled {
                    attempted: index + 1,
                    total,
                });
            }
        }
        Ok(())
    }

    /// One bounded render call; timeouts and cancellation become frame-local errors
    async fn render_frame(&self, prompt: &str, cancel: &CancelToken) -> Result<MediaRef, RenderError> {
        tokio::select! {
            biased;
            result = tokio::time::timeout(self.render_timeout, self.renderer.render(prompt)) => {
                match result {
                    Ok(rendered) => rendered,
                    Err(_) => Err(RenderError::TimedOut(self.render_timeout)),
                }
            }
            () = cancel.cancelled() => Err(RenderError::Cancelled),
        }
    }
}
