//! Creation session
//!
//! Drives the wizard for one logical project:
//! `IDEATION -> SELECTION -> GENERATING -> REVIEW`.
//!
//! The session exclusively owns its [`PipelineRun`]; every mutating
//! operation takes `&mut self`, so at most one pipeline execution can be in
//! flight per session.

use crate::cancel::CancelToken;
use crate::config::StudioConfig;
use crate::error::{ExportError, PipelineError};
use crate::generators::{
    apply_failure_policy, validate_ideas, FrameRenderer, IdeaGenerator, PlaceholderSource,
    StoryboardGenerator,
};
use crate::pipeline::{GenerationPipeline, RunReport};
use crate::progress::ProgressReporter;
use crate::project::{ExportAck, ExportSink, Project};
use crate::types::{IdeaId, Phase, PipelineRun, RecipeIdea, RunSnapshot};
use std::sync::Arc;
use uuid::Uuid;

/// Wizard state for one logical project
pub struct CreationSession {
    ideas: Arc<dyn IdeaGenerator>,
    pipeline: GenerationPipeline,
    run: PipelineRun,
    batch: Vec<RecipeIdea>,
    project_id: Uuid,
}

impl CreationSession {
    /// Create session around already-built collaborators
    pub fn new(ideas: Arc<dyn IdeaGenerator>, pipeline: GenerationPipeline) -> Self {
        Self {
            ideas,
            pipeline,
            run: PipelineRun::new(),
            batch: Vec::new(),
            project_id: Uuid::new_v4(),
        }
    }

    /// Create session from validated configuration
    ///
    /// Applies the render timeout and failure policy from `config`.
    ///
    /// # Errors
    /// `Config` if the configuration fails validation.
    pub fn from_config(
        config: &StudioConfig,
        ideas: Arc<dyn IdeaGenerator>,
        storyboards: Arc<dyn StoryboardGenerator>,
        renderer: Arc<dyn FrameRenderer>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let renderer = apply_failure_policy(
            renderer,
            config.failure_policy,
            PlaceholderSource::new(config.placeholder_url.clone()),
        );
        let pipeline = GenerationPipeline::new(storyboards, renderer)
            .with_render_timeout(config.render_timeout());
        Ok(Self::new(ideas, pipeline))
    }

    /// Current phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.run.phase()
    }

    /// Run being managed
    #[inline]
    #[must_use]
    pub fn run(&self) -> &PipelineRun {
        &self.run
    }

    /// Immutable view of the run
    #[must_use]
    pub fn snapshot(&self) -> RunSnapshot {
        self.run.snapshot()
    }

    /// Ideas of the current batch, in generator order
    #[inline]
    #[must_use]
    pub fn ideas(&self) -> &[RecipeIdea] {
        &self.batch
    }

    /// Ideas of the current batch, highest virality first
    #[must_use]
    pub fn ranked_ideas(&self) -> Vec<&RecipeIdea> {
        let mut ranked: Vec<_> = self.batch.iter().collect();
        ranked.sort_by(|a, b| b.virality_score.cmp(&a.virality_score));
        ranked
    }

    /// Request a batch of ideas for `theme`
    ///
    /// Valid in `IDEATION`, or in `SELECTION` to replace the batch.
    ///
    /// # Errors
    /// - `WrongPhase` once an idea has been selected
    /// - `IdeaGenerationFailed` / `EmptyIdeaBatch`; phase and batch are unchanged
    pub async fn generate_ideas(&mut self, theme: &str) -> Result<&[RecipeIdea], PipelineError> {
        let phase = self.run.phase();
        if phase != Phase::Ideation
            && !(phase == Phase::Selection && self.run.selected_idea().is_none())
        {
            return Err(PipelineError::WrongPhase {
                expected: Phase::Ideation,
                actual: phase,
            });
        }

        tracing::info!(theme, generator = self.ideas.name(), "generating ideas");
        let ideas = self
            .ideas
            .generate_ideas(theme)
            .await
            .and_then(|ideas| validate_ideas(&ideas).map(|()| ideas))
            .map_err(|e| {
                tracing::error!(error = %e, "idea generation failed");
                PipelineError::IdeaGenerationFailed(e)
            })?;
        if ideas.is_empty() {
            tracing::error!("idea generation returned an empty batch");
            return Err(PipelineError::EmptyIdeaBatch);
        }

        self.run.set_theme(theme);
        if phase == Phase::Ideation {
            self.run.advance_to(Phase::Selection)?;
        }
        tracing::info!(count = ideas.len(), "ideas ready");
        self.batch = ideas;
        Ok(&self.batch)
    }

    /// Choose an idea from the current batch; the batch is discarded
    ///
    /// # Errors
    /// `WrongPhase` outside `SELECTION`, `UnknownIdea` if `id` is not in the
    /// batch, `State` if an idea was already selected.
    pub fn select_idea(&mut self, id: &IdeaId) -> Result<&RecipeIdea, PipelineError> {
        if self.run.phase() != Phase::Selection {
            return Err(PipelineError::WrongPhase {
                expected: Phase::Selection,
                actual: self.run.phase(),
            });
        }
        let idx = self
            .batch
            .iter()
            .position(|i| &i.id == id)
            .ok_or_else(|| PipelineError::UnknownIdea(id.to_string()))?;
        let idea = self.batch[idx].clone();
        tracing::info!(idea = %idea.id, title = %idea.title, "idea selected");
        self.run.select(idea)?;
        self.batch.clear();
        self.run
            .selected_idea()
            .ok_or(PipelineError::NoIdeaSelected)
    }

    /// Run the generation pipeline for the selected idea
    ///
    /// # Errors
    /// See [`GenerationPipeline::execute`].
    pub async fn generate(
        &mut self,
        progress: &ProgressReporter,
        cancel: &CancelToken,
    ) -> Result<RunReport, PipelineError> {
        self.pipeline.execute(&mut self.run, progress, cancel).await
    }

    /// Discard the run and start over in `IDEATION` with a new run ID
    pub fn restart(&mut self) {
        tracing::info!(previous = %self.run.id(), "restarting wizard");
        self.run = PipelineRun::new();
        self.batch.clear();
        self.project_id = Uuid::new_v4();
    }

    /// Project view of the current run
    #[must_use]
    pub fn project(&self) -> Project {
        Project::from_run(self.project_id, &self.run)
    }

    /// Hand the reviewed project to an export sink
    ///
    /// # Errors
    /// `Export` if the run is not in `REVIEW`, the sink rejects the payload,
    /// or delivery fails.
    pub async fn export(&self, sink: &dyn ExportSink) -> Result<(Project, ExportAck), PipelineError> {
        let mut project = self.project();
        let payload = project.export_payload()?;
        let ack = sink.export(payload).await?;
        if !ack.accepted {
            return Err(ExportError::Rejected(
                ack.reference.unwrap_or_else(|| "no reason given".to_string()),
            )
            .into());
        }
        project.publish();
        tracing::info!(project = %project.id, reference = ?ack.reference, "project published");
        Ok((project, ack))
    }
}
