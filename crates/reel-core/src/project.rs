//! Projects and export hand-off
//!
//! A run that reaches review becomes a `Ready` project. Exporting hands a
//! serializable payload to an [`ExportSink`]; acceptance publishes it.

use crate::error::ExportError;
use crate::types::{FrameId, FrameKind, FrameState, Phase, PipelineRun, RecipeIdea, RunId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Project lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ProjectStatus {
    /// Not yet generated
    Draft,
    /// Frames rendering
    Generating,
    /// Reviewed, ready to export
    Ready,
    /// Accepted by the export sink
    Published,
}

impl ProjectStatus {
    /// Status implied by a run's phase
    #[must_use]
    pub fn for_phase(phase: Phase) -> Self {
        match phase {
            Phase::Ideation | Phase::Selection => Self::Draft,
            Phase::Generating => Self::Generating,
            Phase::Review => Self::Ready,
        }
    }
}

/// A generated recipe video
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Project ID
    pub id: Uuid,
    /// Run the project was produced by
    pub run_id: RunId,
    /// Display title
    pub title: String,
    /// Recipe idea the project was built from
    pub recipe: Option<RecipeIdea>,
    /// Frames as of the latest snapshot
    pub frames: Vec<ExportedFrame>,
    /// Lifecycle status
    pub status: ProjectStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    phase: Phase,
}

impl Project {
    /// Build a project view of a run
    #[must_use]
    pub fn from_run(id: Uuid, run: &PipelineRun) -> Self {
        let recipe = run.selected_idea().cloned();
        let title = recipe
            .as_ref()
            .map_or_else(|| run.theme().to_string(), |r| r.title.clone());
        Self {
            id,
            run_id: run.id(),
            title,
            recipe,
            frames: exported_frames(run),
            status: ProjectStatus::for_phase(run.phase()),
            created_at: run.created_at(),
            phase: run.phase(),
        }
    }

    /// Payload handed to an export sink
    ///
    /// # Errors
    /// `NotReviewed` unless the run behind the project reached `REVIEW`.
    pub fn export_payload(&self) -> Result<ExportPayload, ExportError> {
        if self.phase != Phase::Review {
            return Err(ExportError::NotReviewed(self.phase));
        }
        Ok(ExportPayload {
            project_id: self.id,
            run_id: self.run_id,
            title: self.title.clone(),
            recipe: self.recipe.clone(),
            frames: self.frames.clone(),
            exported_at: Utc::now(),
        })
    }

    /// Mark published after the sink accepted the payload
    pub fn publish(&mut self) {
        self.status = ProjectStatus::Published;
    }
}

/// Frame as it appears in an export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedFrame {
    /// Frame ID
    pub id: FrameId,
    /// Semantic role
    pub kind: FrameKind,
    /// User-facing description
    pub description: String,
    /// Terminal state
    pub state: FrameState,
    /// Media URI, present for completed frames
    pub media_uri: Option<String>,
    /// Whether the media is a placeholder
    pub placeholder: bool,
    /// Failure reason, present for failed frames
    pub failure: Option<String>,
}

fn exported_frames(run: &PipelineRun) -> Vec<ExportedFrame> {
    run.frames()
        .iter()
        .map(|f| ExportedFrame {
            id: f.id().clone(),
            kind: f.kind(),
            description: f.description().to_string(),
            state: f.state(),
            media_uri: f.media_ref().map(|m| m.uri.clone()),
            placeholder: f.media_ref().is_some_and(|m| m.is_placeholder()),
            failure: f.failure().map(str::to_string),
        })
        .collect()
}

/// Serializable export payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    /// Project ID
    pub project_id: Uuid,
    /// Originating run
    pub run_id: RunId,
    /// Title
    pub title: String,
    /// Recipe idea
    pub recipe: Option<RecipeIdea>,
    /// Frames in order
    pub frames: Vec<ExportedFrame>,
    /// Export time
    pub exported_at: DateTime<Utc>,
}

/// Sink acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportAck {
    /// Whether the sink accepted the payload
    pub accepted: bool,
    /// Sink-side reference, if any
    pub reference: Option<String>,
}

impl ExportAck {
    /// Accepted with reference
    #[must_use]
    pub fn accepted(reference: impl Into<String>) -> Self {
        Self {
            accepted: true,
            reference: Some(reference.into()),
        }
    }
}

/// Destination for reviewed projects (publishing workflow, webhook, file)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExportSink: Send + Sync {
    /// Deliver payload
    async fn export(&self, payload: ExportPayload) -> Result<ExportAck, ExportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Frame, MediaRef, Storyboard};
    use pretty_assertions::assert_eq;

    fn reviewed_run() -> PipelineRun {
        let mut run =
            PipelineRun::for_idea("Summer BBQ", RecipeIdea::new("idea-3", "Grilled Peaches"))
                .unwrap();
        let storyboard = Storyboard::new("hook", "flat lay", vec![]);
        let mut frames: Vec<Frame> = crate::pipeline::build_frames(&storyboard);
        frames[0].begin().unwrap();
        frames[0].complete(MediaRef::new("data:image/png;base64,AA")).unwrap();
        frames[1].begin().unwrap();
        frames[1].fail("no image data returned").unwrap();
        run.begin_generation(frames).unwrap();
        run.advance_to(Phase::Review).unwrap();
        run
    }

    #[test]
    fn status_follows_phase() {
        assert_eq!(ProjectStatus::for_phase(Phase::Selection), ProjectStatus::Draft);
        assert_eq!(ProjectStatus::for_phase(Phase::Generating), ProjectStatus::Generating);
        assert_eq!(ProjectStatus::for_phase(Phase::Review), ProjectStatus::Ready);
    }

    #[test]
    fn reviewed_run_becomes_ready_project() {
        let project = Project::from_run(Uuid::new_v4(), &reviewed_run());
        assert_eq!(project.status, ProjectStatus::Ready);
        assert_eq!(project.title, "Grilled Peaches");
        assert_eq!(project.frames.len(), 2);
        assert_eq!(project.frames[0].media_uri.as_deref(), Some("data:image/png;base64,AA"));
        assert_eq!(project.frames[1].failure.as_deref(), Some("no image data returned"));
    }

    #[test]
    fn draft_project_cannot_export() {
        let run = PipelineRun::new();
        let project = Project::from_run(Uuid::new_v4(), &run);
        assert_eq!(
            project.export_payload(),
            Err(ExportError::NotReviewed(Phase::Ideation))
        );
    }

    #[test]
    fn payload_wire_format() {
        let project = Project::from_run(Uuid::new_v4(), &reviewed_run());
        let payload = project.export_payload().unwrap();
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["title"], "Grilled Peaches");
        assert_eq!(json["frames"][0]["kind"], "HOOK");
        assert_eq!(json["frames"][1]["state"], "failed");
        assert!(json["exportedAt"].is_string());
    }

    #[tokio::test]
    async fn mock_sink_receives_payload() {
        let mut sink = MockExportSink::new();
        sink.expect_export()
            .withf(|p| p.frames.len() == 2)
            .times(1)
            .returning(|_| Ok(ExportAck::accepted("wf-1")));

        let mut project = Project::from_run(Uuid::new_v4(), &reviewed_run());
        let ack = sink.export(project.export_payload().unwrap()).await.unwrap();
        assert!(ack.accepted);
        project.publish();
        assert_eq!(project.status, ProjectStatus::Published);
    }
}
