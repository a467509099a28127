//! `generateContent` client and wire types

use reel_core::{GenerationError, StudioConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Thin client over `POST {base}/v1beta/models/{model}:generateContent`
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    request_timeout: Duration,
}

impl GeminiClient {
    /// Create client; fails if the key is blank
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GenerationError::MissingCredentials(
                "generative service API key is empty".to_string(),
            ));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            request_timeout: Duration::from_secs(60),
        })
    }

    /// Create client from studio configuration
    pub fn from_config(config: &StudioConfig) -> Result<Self, GenerationError> {
        let key = config.api_key().ok_or_else(|| {
            GenerationError::MissingCredentials("no API key configured".to_string())
        })?;
        Ok(Self::new(config.api_base_url.clone(), key)?
            .with_request_timeout(config.request_timeout()))
    }

    /// With default per-request deadline
    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Default per-request deadline
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Endpoint URL for a model
    #[must_use]
    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }

    /// Issue one `generateContent` call
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
        timeout: Duration,
    ) -> Result<GenerateContentResponse, GenerationError> {
        let url = self.endpoint(model);
        tracing::debug!(model, %url, "generateContent");

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .timeout(timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(&e, timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&e, timeout))?;

        if !status.is_success() {
            tracing::warn!(model, status = status.as_u16(), "generateContent rejected");
            return Err(GenerationError::Http {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| GenerationError::malformed(format!("response body: {e}")))
    }
}

fn transport_error(err: &reqwest::Error, timeout: Duration) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout {
            secs: timeout.as_secs(),
        }
    } else {
        GenerationError::Unavailable(err.to_string())
    }
}

/// Request body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Conversation turns
    pub contents: Vec<Content>,
    /// Output configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// Single user turn with one text part
    #[must_use]
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::text(prompt)],
            }],
            generation_config: None,
        }
    }

    /// Ask for JSON output matching `schema`
    #[must_use]
    pub fn with_json_schema(mut self, schema: serde_json::Value) -> Self {
        let config = self.generation_config.get_or_insert_with(GenerationConfig::default);
        config.response_mime_type = Some("application/json".to_string());
        config.response_schema = Some(schema);
        self
    }

    /// Ask for image output
    #[must_use]
    pub fn with_image_config(mut self, aspect_ratio: &str, image_size: &str) -> Self {
        let config = self.generation_config.get_or_insert_with(GenerationConfig::default);
        config.image_config = Some(ImageConfig {
            aspect_ratio: aspect_ratio.to_string(),
            image_size: image_size.to_string(),
        });
        self
    }
}

/// One turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Speaker role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Parts in order
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Text or inline binary part
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Inline binary content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    /// Text part
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }
}

/// Base64 payload with its MIME type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// MIME type, e.g. `image/png`
    #[serde(default)]
    pub mime_type: String,
    /// Base64 data
    pub data: String,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
}

/// Image output shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: String,
    pub image_size: String,
}

/// Response body
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct GenerateContentResponse {
    /// Candidates; only the first is used
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// One candidate answer
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }

    /// Concatenated text of the first candidate
    #[must_use]
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }

    /// First inline data part of the first candidate
    #[must_use]
    pub fn inline_data(&self) -> Option<&InlineData> {
        self.first_parts().iter().find_map(|p| p.inline_data.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_key_is_missing_credentials() {
        let err = GeminiClient::new("https://example.test", " ").unwrap_err();
        assert!(matches!(err, GenerationError::MissingCredentials(_)));
    }

    #[test]
    fn from_config_without_key_fails() {
        let err = GeminiClient::from_config(&StudioConfig::new()).unwrap_err();
        assert!(matches!(err, GenerationError::MissingCredentials(_)));
    }

    #[test]
    fn endpoint_format() {
        let client = GeminiClient::new("https://example.test/", "k").unwrap();
        assert_eq!(
            client.endpoint("gemini-2.5-flash"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn image_request_serialization() {
        let request = GenerateContentRequest::text("a taco").with_image_config("9:16", "1K");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["contents"][0]["parts"][0]["text"], "a taco");
        assert_eq!(json["generationConfig"]["imageConfig"]["aspectRatio"], "9:16");
        assert_eq!(json["generationConfig"]["imageConfig"]["imageSize"], "1K");
        assert!(json["generationConfig"].get("responseSchema").is_none());
    }

    #[test]
    fn schema_request_serialization() {
        let request =
            GenerateContentRequest::text("ideas").with_json_schema(json!({"type": "ARRAY"}));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["generationConfig"]["responseSchema"]["type"], "ARRAY");
    }

    #[test]
    fn response_text_and_inline_data() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "here you go"},
                        {"inlineData": {"mimeType": "image/png", "data": "QUJD"}}
                    ]
                }
            }]
        }))
        .unwrap();

        assert_eq!(response.text().as_deref(), Some("here you go"));
        assert_eq!(response.inline_data().unwrap().data, "QUJD");
    }

    #[test]
    fn empty_response_has_nothing() {
        let response: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.text().is_none());
        assert!(response.inline_data().is_none());
    }
}
