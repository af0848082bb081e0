//! OpenAI LLM client

use crate::openai_compatible::OpenAiCompatibleClient;
use crate::{LlmRequest, LlmResponse};
use futures::stream::BoxStream;
use profchat_core::{ProfchatError, Runnable, StreamEvent};
use std::time::Duration;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI LLM client
#[derive(Clone)]
pub struct OpenAiClient(OpenAiCompatibleClient);

impl OpenAiClient {
    /// Create a new OpenAI client with the given API key
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProfchatError> {
        Self::with_base_url(api_key, OPENAI_BASE_URL)
    }

    /// Same as [`OpenAiClient::new`] against a proxy or test server.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, ProfchatError> {
        let client = OpenAiCompatibleClient::builder()
            .base_url(base_url)?
            .api_key(api_key)
            .default_model(DEFAULT_MODEL)
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self(client))
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.0.set_default_model(model);
        self
    }

    pub fn default_model(&self) -> &str {
        self.0.default_model()
    }
}

#[async_trait::async_trait]
impl Runnable<LlmRequest, LlmResponse> for OpenAiClient {
    async fn invoke(&self, input: LlmRequest) -> Result<LlmResponse, ProfchatError> {
        self.0.invoke(input).await
    }

    fn stream(&self, input: LlmRequest) -> BoxStream<'_, Result<StreamEvent, ProfchatError>> {
        self.0.stream(input)
    }
}
