//! Frame rendering over `generateContent` with an image model

use super::client::{GeminiClient, GenerateContentRequest};
use async_trait::async_trait;
use reel_core::{FrameRenderer, MediaRef, RenderError, StudioConfig};
use std::time::Duration;

const DEFAULT_MIME: &str = "image/png";

/// Slack added to the render timeout for the HTTP deadline
///
/// The pipeline's per-frame timeout must fire first so a stalled render is
/// recorded as timed out rather than as a service error.
pub const HTTP_DEADLINE_SLACK: Duration = Duration::from_secs(5);

/// Renderer returning the first inline image as a data URL
#[derive(Debug, Clone)]
pub struct GeminiFrameRenderer {
    client: GeminiClient,
    model: String,
    aspect_ratio: String,
    image_size: String,
    timeout: Duration,
}

impl GeminiFrameRenderer {
    /// Create renderer with vertical 9:16 1K output
    pub fn new(client: GeminiClient, model: impl Into<String>) -> Self {
        let timeout = client.request_timeout();
        Self {
            client,
            model: model.into(),
            aspect_ratio: "9:16".to_string(),
            image_size: "1K".to_string(),
            timeout,
        }
    }

    /// Create renderer from studio configuration
    ///
    /// The HTTP deadline outlasts the per-frame render timeout by
    /// [`HTTP_DEADLINE_SLACK`].
    pub fn from_config(client: GeminiClient, config: &StudioConfig) -> Self {
        Self::new(client, config.image_model.clone())
            .with_image_config(&config.aspect_ratio, &config.image_size)
            .with_timeout(config.render_timeout() + HTTP_DEADLINE_SLACK)
    }

    /// HTTP deadline for one render call
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// With aspect ratio and size class
    #[must_use]
    pub fn with_image_config(mut self, aspect_ratio: &str, image_size: &str) -> Self {
        self.aspect_ratio = aspect_ratio.to_string();
        self.image_size = image_size.to_string();
        self
    }

    /// With HTTP deadline
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl FrameRenderer for GeminiFrameRenderer {
    fn name(&self) -> &str {
        &self.model
    }

    async fn render(&self, prompt: &str) -> Result<MediaRef, RenderError> {
        let request = GenerateContentRequest::text(prompt)
            .with_image_config(&self.aspect_ratio, &self.image_size);
        let response = self
            .client
            .generate_content(&self.model, &request, self.timeout)
            .await?;

        let image = response.inline_data().ok_or(RenderError::NoImageData)?;
        if image.data.is_empty() {
            return Err(RenderError::NoImageData);
        }
        let mime = if image.mime_type.is_empty() {
            DEFAULT_MIME
        } else {
            image.mime_type.as_str()
        };
        Ok(MediaRef::inline(mime, &image.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_deadline_outlasts_render_timeout() {
        let config = StudioConfig::new().with_api_key("k").with_render_timeout(30);
        let client = GeminiClient::from_config(&config).unwrap();
        let renderer = GeminiFrameRenderer::from_config(client, &config);
        assert!(renderer.timeout() > config.render_timeout());
    }
}
