//! Testing utilities for the Recipe Reels workspace
//!
//! Scripted collaborators and fixtures shared by tests.

#![allow(missing_docs)]

use async_trait::async_trait;
use reel_core::{
    CancelToken, CreationSession, FrameRenderer, GenerationError, GenerationPipeline,
    IdeaGenerator, MediaRef, RecipeIdea, RenderError, Storyboard, StoryboardGenerator,
    StoryboardStep,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Five ideas for the "Summer BBQ" theme, ids `idea-1` .. `idea-5`
pub fn summer_bbq_ideas() -> Vec<RecipeIdea> {
    [
        ("Smash Burger Tacos", 88),
        ("Grilled Peach Burrata", 92),
        ("Elote Corn Ribs", 97),
        ("Watermelon Feta Skewers", 74),
        ("Charred Pineapple Salsa", 81),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (title, score))| {
        RecipeIdea::new(format!("idea-{}", i + 1), title)
            .with_description(format!("{title} for the grill"))
            .with_score(score)
            .with_ingredients(["salt", "oil"])
    })
    .collect()
}

/// Storyboard with `steps` preparation steps
pub fn sample_storyboard(steps: usize) -> Storyboard {
    Storyboard::new(
        "close-up of the finished dish, steam rising",
        "ingredients laid out on a wooden board",
        (1..=steps)
            .map(|i| StoryboardStep::new(format!("step {i}"), format!("hands doing step {i}")))
            .collect(),
    )
}

/// Idea generator returning a fixed result
pub struct ScriptedIdeas {
    result: Result<Vec<RecipeIdea>, GenerationError>,
    calls: AtomicUsize,
}

impl ScriptedIdeas {
    pub fn ok(ideas: Vec<RecipeIdea>) -> Self {
        Self {
            result: Ok(ideas),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: GenerationError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdeaGenerator for ScriptedIdeas {
    fn name(&self) -> &str {
        "scripted-ideas"
    }

    async fn generate_ideas(&self, _theme: &str) -> Result<Vec<RecipeIdea>, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Storyboard generator returning a fixed result
pub struct ScriptedStoryboard {
    result: Result<Storyboard, GenerationError>,
    calls: AtomicUsize,
}

impl ScriptedStoryboard {
    pub fn ok(storyboard: Storyboard) -> Self {
        Self {
            result: Ok(storyboard),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: GenerationError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoryboardGenerator for ScriptedStoryboard {
    fn name(&self) -> &str {
        "scripted-storyboard"
    }

    async fn generate_storyboard(&self, _idea: &RecipeIdea) -> Result<Storyboard, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Renderer whose behavior is scripted per call index (0-based)
///
/// Records prompts and the peak number of concurrent calls.
#[derive(Default)]
pub struct ScriptedRenderer {
    fail_at: HashSet<usize>,
    hang_at: HashSet<usize>,
    cancel_at: Option<(usize, CancelToken)>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the given call
    #[must_use]
    pub fn failing_at(mut self, call: usize) -> Self {
        self.fail_at.insert(call);
        self
    }

    /// Never return from the given call
    #[must_use]
    pub fn hanging_at(mut self, call: usize) -> Self {
        self.hang_at.insert(call);
        self
    }

    /// Trigger `token` when the given call starts
    #[must_use]
    pub fn cancelling_at(mut self, call: usize, token: CancelToken) -> Self {
        self.cancel_at = Some((call, token));
        self
    }

    /// Sleep before every render
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log poisoned").clone()
    }
}

#[async_trait]
impl FrameRenderer for ScriptedRenderer {
    fn name(&self) -> &str {
        "scripted-renderer"
    }

    async fn render(&self, prompt: &str) -> Result<MediaRef, RenderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .expect("prompt log poisoned")
            .push(prompt.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if let Some((at, token)) = &self.cancel_at {
            if *at == call {
                token.cancel();
            }
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.hang_at.contains(&call) {
            std::future::pending::<()>().await;
        }
        if self.fail_at.contains(&call) {
            return Err(RenderError::Failed(format!("scripted failure on call {call}")));
        }
        Ok(MediaRef::inline("image/png", &format!("ZnJhbWUt{call}")))
    }
}

/// Session wired to scripted collaborators
pub fn scripted_session(
    ideas: Arc<ScriptedIdeas>,
    storyboards: Arc<ScriptedStoryboard>,
    renderer: Arc<ScriptedRenderer>,
    render_timeout: Duration,
) -> CreationSession {
    let pipeline =
        GenerationPipeline::new(storyboards, renderer).with_render_timeout(render_timeout);
    CreationSession::new(ideas, pipeline)
}
