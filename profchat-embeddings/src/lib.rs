mod error;

#[cfg(feature = "openai")]
mod openai;

pub use error::EmbeddingProviderError;

#[cfg(feature = "openai")]
pub use openai::OpenAiEmbedding;

#[cfg(feature = "openai")]
pub use async_openai::{config::OpenAIConfig, Client as OpenAiHttpClient};
