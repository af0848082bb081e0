//! Generic OpenAI-compatible LLM client
//!
//! Supports any provider using OpenAI's chat completions format, both as a
//! single response and as a server-sent event stream.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use profchat_core::{ProfchatError, Runnable, StreamEvent};

use crate::sse::{SseDecoder, DONE_SENTINEL};
use crate::{LlmRequest, LlmResponse, Message};

/// Request body for chat completions endpoint
#[derive(Serialize, Debug, Clone)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

/// Non-streaming response from chat completions
#[derive(Deserialize, Debug, Clone)]
pub struct ChatCompletionResponse {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Choice {
    pub index: u32,
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ResponseMessage {
    pub role: String,
    pub content: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Streaming chunk (server-sent events)
#[derive(Deserialize, Debug, Clone)]
pub struct ChatCompletionChunk {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ChunkChoice {
    pub index: u32,
    #[serde(default)]
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Delta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// OpenAI-style error response
#[derive(Deserialize, Debug, Clone)]
pub struct OpenAiError {
    pub error: ErrorDetail,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub code: Option<String>,
}

#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    http: Client,
    base_url: String,
    api_key: Arc<SecretString>,
    default_model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout: Duration,
}

#[derive(Default)]
pub struct OpenAiCompatibleBuilder {
    base_url: Option<Url>,
    api_key: Option<String>,
    default_model: Option<String>,
    timeout: Option<Duration>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenAiCompatibleBuilder {
    pub fn base_url(mut self, base_url: &str) -> Result<Self, ProfchatError> {
        let url = Url::parse(base_url)
            .map_err(|err| ProfchatError::InvalidConfig(format!("invalid base_url: {err}")))?;
        self.base_url = Some(url);
        Ok(self)
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Bounds connection setup, and the whole exchange for non-streaming calls.
    /// Streams are not cut off by it; the caller decides how long to wait
    /// between chunks.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn build(self) -> Result<OpenAiCompatibleClient, ProfchatError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ProfchatError::InvalidConfig("base_url is required".to_string()))?;
        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ProfchatError::InvalidConfig("api_key is required".to_string()))?;
        let default_model = self
            .default_model
            .ok_or_else(|| ProfchatError::InvalidConfig("default_model is required".to_string()))?;
        let timeout = self.timeout.unwrap_or(Duration::from_secs(60));

        let http = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|err| ProfchatError::InvalidConfig(err.to_string()))?;

        Ok(OpenAiCompatibleClient {
            http,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            api_key: Arc::new(SecretString::new(api_key)),
            default_model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout,
        })
    }
}

impl OpenAiCompatibleClient {
    pub fn builder() -> OpenAiCompatibleBuilder {
        OpenAiCompatibleBuilder::default()
    }

    pub fn set_default_model(&mut self, model: impl Into<String>) {
        self.default_model = model.into();
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn chat_request(&self, input: LlmRequest, stream: bool) -> ChatCompletionRequest {
        let model = if input.model.is_empty() {
            self.default_model.clone()
        } else {
            input.model
        };
        ChatCompletionRequest {
            model,
            messages: input.messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream,
        }
    }

    async fn send(
        &self,
        request: &ChatCompletionRequest,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, ProfchatError> {
        let mut builder = self
            .http
            .post(self.completions_url())
            .bearer_auth(self.api_key.expose_secret())
            .json(request);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| ProfchatError::LlmProvider(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<OpenAiError>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));
        Err(ProfchatError::LlmProvider(message))
    }
}

/// Maps one `data:` payload to the events it carries, or to the error that
/// ends the stream.
fn decode_chunk(data: &str, accumulated: &mut String) -> Result<Vec<StreamEvent>, ProfchatError> {
    match serde_json::from_str::<ChatCompletionChunk>(data) {
        Ok(chunk) => {
            let mut events = Vec::new();
            for choice in chunk.choices.into_iter().filter(|choice| choice.index == 0) {
                if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                    accumulated.push_str(&content);
                    events.push(StreamEvent::ContentChunk(content));
                }
            }
            Ok(events)
        }
        Err(err) => match serde_json::from_str::<OpenAiError>(data) {
            Ok(api_error) => Err(ProfchatError::LlmProvider(api_error.error.message)),
            Err(_) => Err(ProfchatError::ParseFailed {
                output: data.to_string(),
                reason: err.to_string(),
            }),
        },
    }
}

#[async_trait::async_trait]
impl Runnable<LlmRequest, LlmResponse> for OpenAiCompatibleClient {
    async fn invoke(&self, input: LlmRequest) -> Result<LlmResponse, ProfchatError> {
        let request = self.chat_request(input, false);
        let response = self
            .send(&request, Some(self.timeout))
            .await?
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|err| ProfchatError::LlmProvider(err.to_string()))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProfchatError::LlmProvider("no choices returned".to_string()))?;

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
        })
    }

    fn stream(&self, input: LlmRequest) -> BoxStream<'_, Result<StreamEvent, ProfchatError>> {
        let request = self.chat_request(input, true);

        async_stream::stream! {
            tracing::debug!(model = %request.model, messages = request.messages.len(), "opening chat stream");
            let response = match self.send(&request, None).await {
                Ok(response) => response,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };

            let mut body = response.bytes_stream();
            let mut decoder = SseDecoder::new();
            let mut accumulated = String::new();

            while let Some(chunk) = body.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        yield Err(ProfchatError::LlmProvider(err.to_string()));
                        return;
                    }
                };

                for data in decoder.push(&bytes) {
                    if data == DONE_SENTINEL {
                        yield Ok(StreamEvent::FinalAnswer(accumulated.clone()));
                        return;
                    }
                    match decode_chunk(&data, &mut accumulated) {
                        Ok(events) => {
                            for event in events {
                                yield Ok(event);
                            }
                        }
                        Err(err) => {
                            yield Err(err);
                            return;
                        }
                    }
                }
            }

            if let Some(data) = decoder.finish() {
                if data == DONE_SENTINEL {
                    yield Ok(StreamEvent::FinalAnswer(accumulated));
                    return;
                }
            }

            yield Err(ProfchatError::LlmProvider(
                "stream ended before [DONE]".to_string(),
            ));
        }
        .boxed()
    }
}
