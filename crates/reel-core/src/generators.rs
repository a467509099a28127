//! Collaborator contracts
//!
//! The pipeline treats idea generation, storyboard generation and frame
//! rendering as black boxes behind these traits. Idea and storyboard output
//! is validated all-or-nothing before the pipeline uses it.

use crate::config::RenderFailurePolicy;
use crate::error::{GenerationError, RenderError};
use crate::types::{MediaRef, RecipeIdea, Storyboard};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

/// Produces a ranked batch of candidate ideas for a theme
#[async_trait]
pub trait IdeaGenerator: Send + Sync {
    /// Generator name
    fn name(&self) -> &str;

    /// Generate ideas; each returned idea is complete or the call fails
    async fn generate_ideas(&self, theme: &str) -> Result<Vec<RecipeIdea>, GenerationError>;
}

/// Produces the storyboard for a selected idea
#[async_trait]
pub trait StoryboardGenerator: Send + Sync {
    /// Generator name
    fn name(&self) -> &str;

    /// Generate storyboard, all-or-nothing
    async fn generate_storyboard(&self, idea: &RecipeIdea) -> Result<Storyboard, GenerationError>;
}

/// Turns one prompt into one media reference
#[async_trait]
pub trait FrameRenderer: Send + Sync {
    /// Renderer name
    fn name(&self) -> &str;

    /// Render a single frame
    async fn render(&self, prompt: &str) -> Result<MediaRef, RenderError>;
}

/// Check an idea batch before it reaches the wizard
///
/// Every idea needs an id and title; ids must be unique within the batch.
pub fn validate_ideas(ideas: &[RecipeIdea]) -> Result<(), GenerationError> {
    let mut seen = HashSet::new();
    for (idx, idea) in ideas.iter().enumerate() {
        if idea.id.as_str().trim().is_empty() {
            return Err(GenerationError::malformed(format!("idea {idx} has no id")));
        }
        if idea.title.trim().is_empty() {
            return Err(GenerationError::malformed(format!(
                "idea {} has no title",
                idea.id
            )));
        }
        if !seen.insert(idea.id.as_str()) {
            return Err(GenerationError::malformed(format!(
                "duplicate idea id {}",
                idea.id
            )));
        }
    }
    Ok(())
}

/// Check a storyboard before frames are built from it
pub fn validate_storyboard(storyboard: &Storyboard) -> Result<(), GenerationError> {
    if storyboard.hook_prompt.trim().is_empty() {
        return Err(GenerationError::malformed("storyboard has no hook prompt"));
    }
    if storyboard.ingredients_prompt.trim().is_empty() {
        return Err(GenerationError::malformed(
            "storyboard has no ingredients prompt",
        ));
    }
    if let Some(idx) = storyboard
        .steps
        .iter()
        .position(|s| s.prompt.trim().is_empty())
    {
        return Err(GenerationError::malformed(format!(
            "storyboard step {} has no prompt",
            idx + 1
        )));
    }
    Ok(())
}

/// Placeholder URL source; `{n}` in the template is replaced with a random number
#[derive(Debug, Clone)]
pub struct PlaceholderSource {
    template: String,
}

impl PlaceholderSource {
    /// Create from template
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Produce a fresh placeholder reference
    #[must_use]
    pub fn next(&self) -> MediaRef {
        let n: u32 = rand::random();
        MediaRef::placeholder(self.template.replace("{n}", &n.to_string()))
    }
}

/// Renderer decorator that swaps failures for a placeholder image
///
/// Used when the deployment is configured with
/// [`RenderFailurePolicy::Placeholder`]; frames then complete with a
/// reference flagged as placeholder. Timeouts and cancellation are passed
/// through unchanged so those frames still end FAILED.
pub struct FallbackRenderer {
    inner: Arc<dyn FrameRenderer>,
    placeholders: PlaceholderSource,
}

impl FallbackRenderer {
    /// Wrap renderer
    pub fn new(inner: Arc<dyn FrameRenderer>, placeholders: PlaceholderSource) -> Self {
        Self {
            inner,
            placeholders,
        }
    }
}

#[async_trait]
impl FrameRenderer for FallbackRenderer {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn render(&self, prompt: &str) -> Result<MediaRef, RenderError> {
        match self.inner.render(prompt).await {
            Ok(media) => Ok(media),
            Err(e) if e.is_deadline() => Err(e),
            Err(e) => {
                tracing::warn!(renderer = self.inner.name(), error = %e, "render failed, using placeholder");
                Ok(self.placeholders.next())
            }
        }
    }
}

/// Apply the deployment's failure policy to a renderer
pub fn apply_failure_policy(
    renderer: Arc<dyn FrameRenderer>,
    policy: RenderFailurePolicy,
    placeholders: PlaceholderSource,
) -> Arc<dyn FrameRenderer> {
    match policy {
        RenderFailurePolicy::MarkFailed => renderer,
        RenderFailurePolicy::Placeholder => {
            Arc::new(FallbackRenderer::new(renderer, placeholders))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StoryboardStep;

    struct AlwaysFails;

    #[async_trait]
    impl FrameRenderer for AlwaysFails {
        fn name(&self) -> &str {
            "always-fails"
        }

        async fn render(&self, _prompt: &str) -> Result<MediaRef, RenderError> {
            Err(RenderError::NoImageData)
        }
    }

    #[test]
    fn valid_batch_passes() {
        let ideas = vec![RecipeIdea::new("a", "A"), RecipeIdea::new("b", "B")];
        assert!(validate_ideas(&ideas).is_ok());
    }

    #[test]
    fn duplicate_ids_rejected() {
        let ideas = vec![RecipeIdea::new("a", "A"), RecipeIdea::new("a", "B")];
        let err = validate_ideas(&ideas).unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[test]
    fn missing_title_rejected() {
        let ideas = vec![RecipeIdea::new("a", "  ")];
        assert!(validate_ideas(&ideas).is_err());
    }

    #[test]
    fn storyboard_without_hook_rejected() {
        let storyboard = Storyboard::new("", "flat lay", vec![]);
        assert!(validate_storyboard(&storyboard).is_err());
    }

    #[test]
    fn storyboard_step_without_prompt_rejected() {
        let storyboard = Storyboard::new(
            "hook",
            "flat lay",
            vec![StoryboardStep::new("chop", "knife on board"), StoryboardStep::new("fry", "")],
        );
        let err = validate_storyboard(&storyboard).unwrap_err();
        assert!(err.to_string().contains("step 2"));
    }

    #[test]
    fn storyboard_without_steps_is_valid() {
        let storyboard = Storyboard::new("hook", "flat lay", vec![]);
        assert!(validate_storyboard(&storyboard).is_ok());
        assert_eq!(storyboard.frame_count(), 2);
    }

    #[test]
    fn placeholder_template_substitution() {
        let source = PlaceholderSource::new("https://img.test/{n}.png");
        let media = source.next();
        assert!(media.is_placeholder());
        assert!(media.uri.starts_with("https://img.test/"));
        assert!(!media.uri.contains("{n}"));
    }

    #[tokio::test]
    async fn fallback_renderer_masks_failures() {
        let renderer = apply_failure_policy(
            Arc::new(AlwaysFails),
            RenderFailurePolicy::Placeholder,
            PlaceholderSource::new("placeholder://{n}"),
        );
        let media = renderer.render("anything").await.unwrap();
        assert!(media.is_placeholder());
    }

    struct TimesOut;

    #[async_trait]
    impl FrameRenderer for TimesOut {
        fn name(&self) -> &str {
            "times-out"
        }

        async fn render(&self, _prompt: &str) -> Result<MediaRef, RenderError> {
            Err(GenerationError::Timeout { secs: 1 }.into())
        }
    }

    #[tokio::test]
    async fn fallback_renderer_keeps_timeouts() {
        let renderer = apply_failure_policy(
            Arc::new(TimesOut),
            RenderFailurePolicy::Placeholder,
            PlaceholderSource::new("placeholder://{n}"),
        );
        let err = renderer.render("anything").await.unwrap_err();
        assert_eq!(err, RenderError::Service(GenerationError::Timeout { secs: 1 }));
    }

    #[tokio::test]
    async fn mark_failed_policy_passes_errors_through() {
        let renderer = apply_failure_policy(
            Arc::new(AlwaysFails),
            RenderFailurePolicy::MarkFailed,
            PlaceholderSource::new("placeholder://{n}"),
        );
        assert_eq!(renderer.render("anything").await, Err(RenderError::NoImageData));
    }
}
