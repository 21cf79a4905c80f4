use anyhow::Result;
use async_trait::async_trait;
use chailv_core::ai::{GeminiClient, GenerationConfig};

/// One generation call: the model, the user-turn parts and sampling settings
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub parts: Vec<String>,
    pub config: GenerationConfig,
}

/// Backend that turns a prompt into text
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, api_key: &str, request: &GenerateRequest) -> Result<String>;
}

/// Generation through the Gemini REST API
pub struct GeminiGenerator {
    base_url: String,
}

impl GeminiGenerator {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(&self, api_key: &str, request: &GenerateRequest) -> Result<String> {
        GeminiClient::with_base_url(api_key, &self.base_url)
            .generate(&request.model, &request.parts, request.config)
            .await
    }
}
