// OpenAI-compatible client (chat completions over HTTP + SSE)
pub mod openai_compatible;

// Provider-specific clients
pub mod providers;

pub mod sse;

pub use profchat_core::{Llm, LlmRequest, LlmResponse, Message, Role};

pub use openai_compatible::{
    ChatCompletionRequest, OpenAiCompatibleBuilder, OpenAiCompatibleClient,
};

pub use providers::openai::OpenAiClient;
