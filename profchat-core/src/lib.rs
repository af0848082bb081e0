mod conversation;
mod embedding;
mod error;
mod llm;
mod record;
mod runnable;
mod value;
mod vector_index;

pub use conversation::{Conversation, InvalidConversation};
pub use embedding::Embedding;
pub use error::{EmbeddingError, ProfchatError, StoreError};
pub use llm::{LlmRequest, LlmResponse, Message, Role};
pub use record::RetrievedRecord;
pub use runnable::{Llm, Runnable, StreamEvent};
pub use value::Value;
pub use vector_index::VectorIndex;
