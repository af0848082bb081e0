use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::{LlmRequest, LlmResponse, ProfchatError};

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    ContentChunk(String),
    FinalAnswer(String),
}

#[async_trait]
pub trait Runnable<Input: Send + 'static, Output: Send + 'static> {
    async fn invoke(&self, input: Input) -> Result<Output, ProfchatError>;

    fn stream(&self, input: Input) -> BoxStream<'_, Result<StreamEvent, ProfchatError>>;
}

/// A chat model: anything that runs an [`LlmRequest`] to completion or as a stream.
pub trait Llm: Runnable<LlmRequest, LlmResponse> + Send + Sync {}

impl<T> Llm for T where T: Runnable<LlmRequest, LlmResponse> + Send + Sync {}
