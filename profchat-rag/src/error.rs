use std::fmt;
use std::time::Duration;

use profchat_core::{EmbeddingError, InvalidConversation, ProfchatError, StoreError};

/// The upstream call a bounded wait was guarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Embedding,
    Retrieval,
    Completion,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Embedding => "embedding",
            Stage::Retrieval => "retrieval",
            Stage::Completion => "completion",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] InvalidConversation),
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(#[source] EmbeddingError),
    #[error("vector index query failed: {0}")]
    RetrievalFailed(#[source] StoreError),
    #[error("no matching records in the vector index")]
    NoMatches,
    #[error("completion failed: {0}")]
    CompletionFailed(#[source] ProfchatError),
    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: Stage, after: Duration },
    #[error("completion stream failed: {0}")]
    UpstreamStream(#[source] ProfchatError),
}

impl ChatError {
    /// Stable identifier reported in logs and error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::InvalidRequest(_) => "invalid_request",
            ChatError::EmbeddingUnavailable(_) => "embedding_unavailable",
            ChatError::RetrievalFailed(_) => "retrieval_failed",
            ChatError::NoMatches => "no_matches",
            ChatError::CompletionFailed(_) => "completion_failed",
            ChatError::Timeout { .. } => "timeout",
            ChatError::UpstreamStream(_) => "upstream_stream",
        }
    }

    /// True when the caller sent something unusable, false for upstream failures.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ChatError::InvalidRequest(_))
    }
}
