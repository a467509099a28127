//! Gemini-style `generateContent` backends
//!
//! One client shared by three collaborators:
//! - [`GeminiIdeaGenerator`] (fast text model, JSON array schema)
//! - [`GeminiStoryboardGenerator`] (reasoning model, JSON object schema)
//! - [`GeminiFrameRenderer`] (image model, vertical image config)

mod client;
mod ideas;
mod renderer;
mod storyboard;

pub use client::{
    Candidate, Content, GeminiClient, GenerateContentRequest, GenerateContentResponse,
    GenerationConfig, ImageConfig, InlineData, Part, API_KEY_HEADER,
};
pub use ideas::GeminiIdeaGenerator;
pub use renderer::{GeminiFrameRenderer, HTTP_DEADLINE_SLACK};
pub use storyboard::GeminiStoryboardGenerator;

use reel_core::{FrameRenderer, GenerationError, IdeaGenerator, StoryboardGenerator, StudioConfig};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// The three collaborators built from one configuration
pub struct GeminiBackends {
    /// Idea generator
    pub ideas: Arc<dyn IdeaGenerator>,
    /// Storyboard generator
    pub storyboards: Arc<dyn StoryboardGenerator>,
    /// Frame renderer
    pub renderer: Arc<dyn FrameRenderer>,
}

impl GeminiBackends {
    /// Build every collaborator; fails if no API key is configured
    pub fn from_config(config: &StudioConfig) -> Result<Self, GenerationError> {
        let client = GeminiClient::from_config(config)?;
        Ok(Self {
            ideas: Arc::new(GeminiIdeaGenerator::from_config(client.clone(), config)),
            storyboards: Arc::new(GeminiStoryboardGenerator::from_config(client.clone(), config)),
            renderer: Arc::new(GeminiFrameRenderer::from_config(client, config)),
        })
    }
}

/// Parse model JSON output, tolerating a Markdown code fence around it
pub(crate) fn decode_json<T: DeserializeOwned>(text: &str) -> Result<T, GenerationError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(body.trim()).map_err(|e| GenerationError::malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_core::Storyboard;

    #[test]
    fn decode_plain_and_fenced_json() {
        let plain: Vec<u32> = decode_json("[1, 2]").unwrap();
        assert_eq!(plain, vec![1, 2]);

        let fenced: Vec<u32> = decode_json("```json\n[3]\n```").unwrap();
        assert_eq!(fenced, vec![3]);
    }

    #[test]
    fn incomplete_storyboard_is_malformed() {
        let err = decode_json::<Storyboard>(r#"{"hookPrompt":"dish"}"#).unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[test]
    fn backends_need_a_key() {
        assert!(GeminiBackends::from_config(&StudioConfig::new()).is_err());
        let config = StudioConfig::new().with_api_key("k");
        let backends = GeminiBackends::from_config(&config).unwrap();
        assert_eq!(backends.renderer.name(), "gemini-3-pro-image-preview");
        assert_eq!(backends.ideas.name(), "gemini-2.5-flash");
    }
}
