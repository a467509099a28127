//! Idea generation over `generateContent`

use super::client::{GeminiClient, GenerateContentRequest};
use super::decode_json;
use async_trait::async_trait;
use reel_core::types::MAX_VIRALITY_SCORE;
use reel_core::{GenerationError, IdeaGenerator, RecipeIdea, StudioConfig};
use serde::Deserialize;
use serde_json::json;

/// Idea generator backed by a text model with a JSON response schema
#[derive(Debug, Clone)]
pub struct GeminiIdeaGenerator {
    client: GeminiClient,
    model: String,
    count: usize,
}

impl GeminiIdeaGenerator {
    /// Create generator
    pub fn new(client: GeminiClient, model: impl Into<String>, count: usize) -> Self {
        Self {
            client,
            model: model.into(),
            count,
        }
    }

    /// Create generator from studio configuration
    pub fn from_config(client: GeminiClient, config: &StudioConfig) -> Self {
        Self::new(client, config.idea_model.clone(), config.idea_count)
    }

    /// Prompt sent for a theme
    #[must_use]
    pub fn prompt(&self, theme: &str) -> String {
        format!(
            "Generate {} trending, viral-worthy recipe ideas suitable for short-form \
             vertical video content.\nFocus on the theme: {theme}.\n\
             The recipes should be visually appealing.\nReturn JSON.",
            self.count
        )
    }

    fn schema() -> serde_json::Value {
        json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "id": { "type": "STRING" },
                    "title": { "type": "STRING" },
                    "description": { "type": "STRING" },
                    "viralityScore": { "type": "INTEGER" },
                    "ingredients": { "type": "ARRAY", "items": { "type": "STRING" } }
                },
                "required": ["id", "title", "description", "ingredients"]
            }
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdeaWire {
    id: String,
    title: String,
    description: String,
    #[serde(default)]
    virality_score: Option<i64>,
    ingredients: Vec<String>,
}

impl From<IdeaWire> for RecipeIdea {
    fn from(wire: IdeaWire) -> Self {
        RecipeIdea::new(wire.id, wire.title)
            .with_description(wire.description)
            .with_score(wire.virality_score.unwrap_or(0))
            .with_ingredients(wire.ingredients)
    }
}

#[async_trait]
impl IdeaGenerator for GeminiIdeaGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate_ideas(&self, theme: &str) -> Result<Vec<RecipeIdea>, GenerationError> {
        let request =
            GenerateContentRequest::text(self.prompt(theme)).with_json_schema(Self::schema());
        let response = self
            .client
            .generate_content(&self.model, &request, self.client.request_timeout())
            .await?;
        let text = response
            .text()
            .ok_or_else(|| GenerationError::malformed("idea response has no text"))?;
        let ideas: Vec<IdeaWire> = decode_json(&text)?;
        if ideas.len() != self.count {
            tracing::warn!(
                requested = self.count,
                returned = ideas.len(),
                "idea batch size differs from request"
            );
        }

        Ok(ideas
            .into_iter()
            .map(|wire| {
                if let Some(score) = wire.virality_score {
                    if !(0..=i64::from(MAX_VIRALITY_SCORE)).contains(&score) {
                        tracing::debug!(id = %wire.id, score, "virality score clamped");
                    }
                }
                RecipeIdea::from(wire)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_idea_score_defaults_and_clamps() {
        let wire: IdeaWire = serde_json::from_str(
            r#"{"id":"a","title":"Corn Ribs","description":"d","viralityScore":140,"ingredients":["corn"]}"#,
        )
        .unwrap();
        assert_eq!(RecipeIdea::from(wire).virality_score, 100);

        let wire: IdeaWire = serde_json::from_str(
            r#"{"id":"b","title":"Peaches","description":"d","ingredients":[]}"#,
        )
        .unwrap();
        assert_eq!(RecipeIdea::from(wire).virality_score, 0);
    }

    #[test]
    fn wire_idea_requires_description_and_ingredients() {
        assert!(serde_json::from_str::<IdeaWire>(
            r#"{"id":"a","title":"Corn Ribs","ingredients":["corn"]}"#
        )
        .is_err());
        assert!(serde_json::from_str::<IdeaWire>(
            r#"{"id":"a","title":"Corn Ribs","description":"d"}"#
        )
        .is_err());
    }

    #[test]
    fn prompt_mentions_theme_and_count() {
        let client = GeminiClient::new("https://example.test", "k").unwrap();
        let generator = GeminiIdeaGenerator::new(client, "gemini-2.5-flash", 5);
        let prompt = generator.prompt("Summer BBQ");
        assert!(prompt.contains("Generate 5"));
        assert!(prompt.contains("Summer BBQ"));
    }
}
