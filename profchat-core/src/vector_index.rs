use async_trait::async_trait;

use crate::{RetrievedRecord, StoreError};

/// Read side of a hosted nearest-neighbor index.
///
/// Implementations return at most `top_k` records ordered by descending
/// similarity, in whatever order the index resolves ties.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<RetrievedRecord>, StoreError>;
}
