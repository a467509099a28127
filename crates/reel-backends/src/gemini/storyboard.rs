//! Storyboard generation over `generateContent`

use super::client::{GeminiClient, GenerateContentRequest};
use super::decode_json;
use async_trait::async_trait;
use reel_core::{GenerationError, RecipeIdea, Storyboard, StoryboardGenerator, StudioConfig};
use serde_json::json;

/// Storyboard generator backed by a reasoning model with a JSON schema
#[derive(Debug, Clone)]
pub struct GeminiStoryboardGenerator {
    client: GeminiClient,
    model: String,
}

impl GeminiStoryboardGenerator {
    /// Create generator
    pub fn new(client: GeminiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Create generator from studio configuration
    pub fn from_config(client: GeminiClient, config: &StudioConfig) -> Self {
        Self::new(client, config.storyboard_model.clone())
    }

    /// Prompt sent for an idea
    #[must_use]
    pub fn prompt(idea: &RecipeIdea) -> String {
        format!(
            "Create a visual storyboard for a viral cooking video for: {}.\n\n\
             I need:\n\
             1. A \"Hook\" image prompt: the finished dish looking absolutely delicious, \
             cinematic lighting, 4k.\n\
             2. An \"Ingredients\" image prompt: knolling style (flat lay) of ingredients, \
             clean background.\n\
             3. 3 to 5 key preparation steps. For each step, provide a short description \
             and a highly detailed image generation prompt.\n\n\
             The image prompts must be optimized for a realistic AI image generator.",
            idea.title
        )
    }

    fn schema() -> serde_json::Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "hookPrompt": { "type": "STRING" },
                "ingredientsPrompt": { "type": "STRING" },
                "steps": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "description": { "type": "STRING" },
                            "prompt": { "type": "STRING" }
                        },
                        "required": ["description", "prompt"]
                    }
                }
            },
            "required": ["hookPrompt", "ingredientsPrompt", "steps"]
        })
    }
}

#[async_trait]
impl StoryboardGenerator for GeminiStoryboardGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate_storyboard(&self, idea: &RecipeIdea) -> Result<Storyboard, GenerationError> {
        let request =
            GenerateContentRequest::text(Self::prompt(idea)).with_json_schema(Self::schema());
        let response = self
            .client
            .generate_content(&self.model, &request, self.client.request_timeout())
            .await?;
        let text = response
            .text()
            .ok_or_else(|| GenerationError::malformed("storyboard response has no text"))?;
        decode_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_the_recipe() {
        let prompt = GeminiStoryboardGenerator::prompt(&RecipeIdea::new("i", "Elote Corn Ribs"));
        assert!(prompt.contains("Elote Corn Ribs"));
        assert!(prompt.contains("3 to 5 key preparation steps"));
    }

    #[test]
    fn schema_requires_all_sections() {
        let schema = GeminiStoryboardGenerator::schema();
        assert_eq!(schema["required"].as_array().unwrap().len(), 3);
    }
}
