//! Provider-specific LLM clients

pub mod openai;
