use profchat_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PineconeError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error(
        "pinecone api error {status}: {message} (retry_after={retry_after_seconds:?}, namespace={namespace:?})"
    )]
    Api {
        status: u16,
        message: String,
        retry_after_seconds: Option<u64>,
        namespace: Option<String>,
    },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

impl From<PineconeError> for StoreError {
    fn from(value: PineconeError) -> Self {
        match value {
            PineconeError::DimensionMismatch { expected, got } => {
                StoreError::DimensionMismatch { expected, got }
            }
            other => StoreError::Internal(Box::new(other)),
        }
    }
}
