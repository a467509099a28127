//! Reel Backends - HTTP collaborators for the generation pipeline
//!
//! - [`gemini`]: idea, storyboard and frame rendering over `generateContent`
//! - [`webhook`]: export sink posting reviewed projects to a workflow URL

#![warn(unreachable_pub)]

pub mod gemini;
pub mod webhook;

pub use gemini::{
    GeminiBackends, GeminiClient, GeminiFrameRenderer, GeminiIdeaGenerator,
    GeminiStoryboardGenerator,
};
pub use webhook::WebhookExportSink;
