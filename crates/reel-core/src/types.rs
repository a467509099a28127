//! Core types for the generation pipeline
//!
//! Defines the fundamental data model:
//! - Recipe ideas produced by the idea generator
//! - Storyboards (text-only plans) produced per run
//! - Frames, the unit of rendering work and of progress feedback
//! - The pipeline run aggregate and its coarse wizard phase

use crate::error::StateError;
use crate::state_machine::{validate_frame_transition, validate_phase_transition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Highest virality score an idea can carry
pub const MAX_VIRALITY_SCORE: u8 = 100;

/// Unique run identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub Ulid);

impl RunId {
    /// Generate new run ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque idea identifier, unique within one generated batch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdeaId(pub String);

impl IdeaId {
    /// Borrow the raw identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for IdeaId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for IdeaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Candidate recipe idea
///
/// Immutable once produced. The virality score is display-only and never
/// influences pipeline behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeIdea {
    /// Identifier within the batch
    pub id: IdeaId,
    /// Display title
    pub title: String,
    /// Display description
    pub description: String,
    /// Display ranking score in `[0, 100]`
    pub virality_score: u8,
    /// Ingredient list (display-only)
    pub ingredients: Vec<String>,
}

impl RecipeIdea {
    /// Create new idea with an empty description and no ingredients
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: IdeaId(id.into()),
            title: title.into(),
            description: String::new(),
            virality_score: 0,
            ingredients: Vec::new(),
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// With virality score, clamped into `[0, 100]`
    #[inline]
    #[must_use]
    pub fn with_score(mut self, score: i64) -> Self {
        self.virality_score = clamp_score(score);
        self
    }

    /// With ingredients
    #[inline]
    #[must_use]
    pub fn with_ingredients<I, S>(mut self, ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ingredients = ingredients.into_iter().map(Into::into).collect();
        self
    }
}

/// Clamp an arbitrary score reported by a generator into `[0, 100]`
#[must_use]
pub fn clamp_score(score: i64) -> u8 {
    u8::try_from(score.clamp(0, i64::from(MAX_VIRALITY_SCORE))).unwrap_or(MAX_VIRALITY_SCORE)
}

/// One preparation step of a storyboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryboardStep {
    /// User-facing description
    pub description: String,
    /// Image prompt for the renderer
    pub prompt: String,
}

impl StoryboardStep {
    /// Create new step
    #[inline]
    #[must_use]
    pub fn new(description: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            prompt: prompt.into(),
        }
    }
}

/// Text-only plan from which frames are built
///
/// Produced once per run and consumed immediately by frame construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Storyboard {
    /// Prompt for the finished-dish hook frame
    pub hook_prompt: String,
    /// Prompt for the ingredients flat-lay frame
    pub ingredients_prompt: String,
    /// Preparation steps in order
    pub steps: Vec<StoryboardStep>,
}

impl Storyboard {
    /// Create new storyboard
    #[must_use]
    pub fn new(
        hook_prompt: impl Into<String>,
        ingredients_prompt: impl Into<String>,
        steps: Vec<StoryboardStep>,
    ) -> Self {
        Self {
            hook_prompt: hook_prompt.into(),
            ingredients_prompt: ingredients_prompt.into(),
            steps,
        }
    }

    /// Number of frames this storyboard expands into
    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> usize {
        2 + self.steps.len()
    }
}

/// Frame identifier, unique within a run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(pub String);

impl FrameId {
    /// Borrow the raw identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Semantic role of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrameKind {
    /// Finished dish, shown first
    Hook,
    /// Ingredient flat lay
    Ingredients,
    /// Preparation step
    Step,
    /// Final plated result
    Result,
}

impl FrameKind {
    /// Label used in logs and progress output
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hook => "HOOK",
            Self::Ingredients => "INGREDIENTS",
            Self::Step => "STEP",
            Self::Result => "RESULT",
        }
    }
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-frame rendering state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameState {
    /// Not yet started
    Pending,
    /// Renderer call in flight
    Generating,
    /// Rendered, media reference present
    Completed,
    /// Render failed, timed out or was cancelled
    Failed,
}

impl FrameState {
    /// Whether no further transition can occur
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for FrameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Reference to rendered media
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    /// Data URL or remote URL
    pub uri: String,
    /// Whether this is a stand-in produced after a renderer failure
    #[serde(default)]
    pub placeholder: bool,
}

impl MediaRef {
    /// Reference to real rendered output
    #[inline]
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            placeholder: false,
        }
    }

    /// Reference to a placeholder image
    #[inline]
    #[must_use]
    pub fn placeholder(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            placeholder: true,
        }
    }

    /// Inline base64 image as a data URL
    #[must_use]
    pub fn inline(mime_type: &str, base64_data: &str) -> Self {
        Self::new(format!("data:{mime_type};base64,{base64_data}"))
    }

    /// Whether this reference is a placeholder
    #[inline]
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}

/// One unit of visual content
///
/// `prompt` and `description` are fixed at construction. State only moves
/// forward through the frame state machine; `media_ref` is set exactly when
/// the frame completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    id: FrameId,
    kind: FrameKind,
    prompt: String,
    description: String,
    media_ref: Option<MediaRef>,
    state: FrameState,
    failure: Option<String>,
}

impl Frame {
    /// Create a pending frame
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        kind: FrameKind,
        prompt: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: FrameId(id.into()),
            kind,
            prompt: prompt.into(),
            description: description.into(),
            media_ref: None,
            state: FrameState::Pending,
            failure: None,
        }
    }

    /// Frame ID
    #[inline]
    #[must_use]
    pub fn id(&self) -> &FrameId {
        &self.id
    }

    /// Semantic role
    #[inline]
    #[must_use]
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Prompt sent to the renderer
    #[inline]
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// User-facing description
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Rendered output, present only when completed
    #[inline]
    #[must_use]
    pub fn media_ref(&self) -> Option<&MediaRef> {
        self.media_ref.as_ref()
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Failure reason, present only when failed
    #[inline]
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// `PENDING -> GENERATING`
    pub(crate) fn begin(&mut self) -> Result<(), StateError> {
        validate_frame_transition(self.state, FrameState::Generating)?;
        self.state = FrameState::Generating;
        Ok(())
    }

    /// `GENERATING -> COMPLETED`
    pub(crate) fn complete(&mut self, media: MediaRef) -> Result<(), StateError> {
        validate_frame_transition(self.state, FrameState::Completed)?;
        self.state = FrameState::Completed;
        self.media_ref = Some(media);
        Ok(())
    }

    /// `GENERATING -> FAILED`
    pub(crate) fn fail(&mut self, reason: impl Into<String>) -> Result<(), StateError> {
        validate_frame_transition(self.state, FrameState::Failed)?;
        self.state = FrameState::Failed;
        self.failure = Some(reason.into());
        Ok(())
    }
}

/// Coarse wizard phase; only ever advances within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Waiting for a theme
    Ideation,
    /// Ideas available, waiting for a selection
    Selection,
    /// Frames being rendered
    Generating,
    /// All frames terminal
    Review,
}

impl Phase {
    /// Zero-based wizard step
    #[inline]
    #[must_use]
    pub fn step(&self) -> u8 {
        match self {
            Self::Ideation => 0,
            Self::Selection => 1,
            Self::Generating => 2,
            Self::Review => 3,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ideation => "IDEATION",
            Self::Selection => "SELECTION",
            Self::Generating => "GENERATING",
            Self::Review => "REVIEW",
        };
        f.write_str(s)
    }
}

/// The aggregate one pipeline run manages
///
/// Mutated only by its owner (the creation session and the pipeline loop it
/// drives); observers receive [`RunSnapshot`] copies.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    id: RunId,
    theme: String,
    selected_idea: Option<RecipeIdea>,
    frames: Vec<Frame>,
    phase: Phase,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    /// Create new run in `IDEATION`
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: RunId::new(),
            theme: String::new(),
            selected_idea: None,
            frames: Vec::new(),
            phase: Phase::Ideation,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Create new run with a selected idea, ready for generation
    pub fn for_idea(theme: impl Into<String>, idea: RecipeIdea) -> Result<Self, StateError> {
        let mut run = Self::new();
        run.set_theme(theme);
        run.advance_to(Phase::Selection)?;
        run.select(idea)?;
        Ok(run)
    }

    /// Run ID
    #[inline]
    #[must_use]
    pub fn id(&self) -> RunId {
        self.id
    }

    /// Input trend/theme
    #[inline]
    #[must_use]
    pub fn theme(&self) -> &str {
        &self.theme
    }

    /// Selected idea
    #[inline]
    #[must_use]
    pub fn selected_idea(&self) -> Option<&RecipeIdea> {
        self.selected_idea.as_ref()
    }

    /// Ordered frames
    #[inline]
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Current phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Creation time
    #[inline]
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time the run reached `REVIEW`
    #[inline]
    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Number of frames in the given state
    #[must_use]
    pub fn count(&self, state: FrameState) -> usize {
        self.frames.iter().filter(|f| f.state() == state).count()
    }

    /// Immutable copy for observers
    #[must_use]
    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            run_id: self.id,
            theme: self.theme.clone(),
            phase: self.phase,
            idea_title: self.selected_idea.as_ref().map(|i| i.title.clone()),
            frames: self.frames.clone(),
            completed: self.count(FrameState::Completed),
            failed: self.count(FrameState::Failed),
            total: self.frames.len(),
        }
    }

    pub(crate) fn set_theme(&mut self, theme: impl Into<String>) {
        self.theme = theme.into();
    }

    /// Set the selected idea; allowed once per run
    pub(crate) fn select(&mut self, idea: RecipeIdea) -> Result<(), StateError> {
        if self.selected_idea.is_some() {
            return Err(StateError::IdeaAlreadySelected);
        }
        self.selected_idea = Some(idea);
        Ok(())
    }

    pub(crate) fn advance_to(&mut self, next: Phase) -> Result<(), StateError> {
        validate_phase_transition(self.phase, next)?;
        self.phase = next;
        if next == Phase::Review {
            self.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Install the constructed frames and enter `GENERATING`
    pub(crate) fn begin_generation(&mut self, frames: Vec<Frame>) -> Result<(), StateError> {
        self.advance_to(Phase::Generating)?;
        self.frames = frames;
        Ok(())
    }

    pub(crate) fn frame_mut(&mut self, index: usize) -> Option<&mut Frame> {
        self.frames.get_mut(index)
    }
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of a run handed to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    /// Run the snapshot was taken from
    pub run_id: RunId,
    /// Input theme
    pub theme: String,
    /// Phase at snapshot time
    pub phase: Phase,
    /// Title of the selected idea
    pub idea_title: Option<String>,
    /// Ordered frames
    pub frames: Vec<Frame>,
    /// Frames in `COMPLETED`
    pub completed: usize,
    /// Frames in `FAILED`
    pub failed: usize,
    /// Total frames
    pub total: usize,
}

impl RunSnapshot {
    /// Index of the frame currently generating, if any
    #[must_use]
    pub fn generating_index(&self) -> Option<usize> {
        self.frames
            .iter()
            .position(|f| f.state() == FrameState::Generating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_generation() {
        let id1 = RunId::new();
        let id2 = RunId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn score_is_clamped() {
        assert_eq!(clamp_score(-5), 0);
        assert_eq!(clamp_score(42), 42);
        assert_eq!(clamp_score(250), 100);
    }

    #[test]
    fn idea_builder() {
        let idea = RecipeIdea::new("idea-1", "Grilled Peach Salad")
            .with_description("Smoky and sweet")
            .with_score(87)
            .with_ingredients(["peaches", "burrata"]);

        assert_eq!(idea.id.as_str(), "idea-1");
        assert_eq!(idea.virality_score, 87);
        assert_eq!(idea.ingredients.len(), 2);
    }

    #[test]
    fn idea_wire_format_is_camel_case() {
        let idea = RecipeIdea::new("a", "b").with_score(10);
        let json = serde_json::to_value(&idea).unwrap();
        assert_eq!(json["viralityScore"], 10);
        assert_eq!(json["id"], "a");
    }

    #[test]
    fn frame_lifecycle_completed() {
        let mut frame = Frame::new("hook", FrameKind::Hook, "prompt", "desc");
        assert_eq!(frame.state(), FrameState::Pending);

        frame.begin().unwrap();
        frame.complete(MediaRef::new("data:image/png;base64,AAAA")).unwrap();

        assert_eq!(frame.state(), FrameState::Completed);
        assert!(frame.media_ref().is_some());
        assert!(frame.failure().is_none());
    }

    #[test]
    fn frame_cannot_complete_without_generating() {
        let mut frame = Frame::new("hook", FrameKind::Hook, "prompt", "desc");
        assert!(frame.complete(MediaRef::new("x")).is_err());
        assert!(frame.fail("boom").is_err());
        assert_eq!(frame.state(), FrameState::Pending);
    }

    #[test]
    fn failed_frame_has_no_media() {
        let mut frame = Frame::new("step-1", FrameKind::Step, "prompt", "desc");
        frame.begin().unwrap();
        frame.fail("quota exceeded").unwrap();

        assert!(frame.media_ref().is_none());
        assert_eq!(frame.failure(), Some("quota exceeded"));
        assert!(frame.begin().is_err());
    }

    #[test]
    fn phase_ordering_matches_wizard() {
        assert!(Phase::Ideation < Phase::Selection);
        assert!(Phase::Generating < Phase::Review);
        assert_eq!(Phase::Review.step(), 3);
    }

    #[test]
    fn idea_selected_once() {
        let mut run = PipelineRun::new();
        run.select(RecipeIdea::new("a", "A")).unwrap();
        assert!(matches!(
            run.select(RecipeIdea::new("b", "B")),
            Err(StateError::IdeaAlreadySelected)
        ));
    }

    #[test]
    fn media_ref_inline_data_url() {
        let media = MediaRef::inline("image/png", "QUJD");
        assert_eq!(media.uri, "data:image/png;base64,QUJD");
        assert!(!media.is_placeholder());
        assert!(MediaRef::placeholder("https://x").is_placeholder());
    }
}
