//! Reel Core - recipe video generation pipeline
//!
//! Turns a food trend into an ordered set of rendered frames:
//! - Generates ranked recipe ideas for a theme
//! - Expands the chosen idea into a storyboard
//! - Renders frames strictly one at a time with per-frame failure containment
//! - Publishes a progress snapshot after every frame transition
//! - Hands reviewed projects to an export sink
//!
//! # Example
//!
//! ```rust,ignore
//! use reel_core::prelude::*;
//!
//! # async fn example(ideas: Arc<dyn IdeaGenerator>, storyboards: Arc<dyn StoryboardGenerator>, renderer: Arc<dyn FrameRenderer>) -> Result<(), PipelineError> {
//! let config = StudioConfig::from_env();
//! let mut session = CreationSession::from_config(&config, ideas, storyboards, renderer)?;
//!
//! session.generate_ideas("Summer BBQ").await?;
//! let pick = session.ranked_ideas()[0].id.clone();
//! session.select_idea(&pick)?;
//!
//! let report = session.generate(&ProgressReporter::silent(), &CancelToken::new()).await?;
//! println!("{}/{} frames completed", report.completed, report.total);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod cancel;
pub mod config;
pub mod error;
pub mod generators;
pub mod pipeline;
pub mod progress;
pub mod project;
pub mod session;
pub mod state_machine;
pub mod types;

pub use cancel::CancelToken;
pub use config::{RenderFailurePolicy, StudioConfig};
pub use error::{ConfigError, ExportError, GenerationError, PipelineError, RenderError, StateError};
pub use generators::{
    apply_failure_policy, validate_ideas, validate_storyboard, FallbackRenderer, FrameRenderer,
    IdeaGenerator, PlaceholderSource, StoryboardGenerator,
};
pub use pipeline::{build_frames, GenerationPipeline, RunReport, DEFAULT_RENDER_TIMEOUT};
pub use progress::{ProgressEvent, ProgressReporter};
pub use project::{ExportAck, ExportPayload, ExportSink, ExportedFrame, Project, ProjectStatus};
pub use session::CreationSession;
pub use types::{
    Frame, FrameId, FrameKind, FrameState, IdeaId, MediaRef, Phase, PipelineRun, RecipeIdea,
    RunId, RunSnapshot, Storyboard, StoryboardStep,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Reel Core
    pub use crate::{
        CancelToken, CreationSession, Frame, FrameRenderer, FrameState, GenerationPipeline,
        IdeaGenerator, Phase, PipelineError, ProgressEvent, ProgressReporter, RecipeIdea,
        RunReport, Storyboard, StoryboardGenerator, StudioConfig,
    };
    pub use std::sync::Arc;
    pub use std::time::Duration;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
