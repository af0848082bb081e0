use profchat_core::{RetrievedRecord, StoreError, VectorIndex};
use serde_json::Value;
use tracing::Instrument;

use crate::client::PineconeHttpClient;
use crate::config::PineconeIndexBuilder;
use crate::mapper::match_to_record;
use crate::types::{IndexStatsResponse, QueryRequest, QueryResponse};
use crate::PineconeError;

pub struct PineconeIndex {
    pub(crate) client: PineconeHttpClient,
    pub(crate) namespace: Option<String>,
    pub(crate) index_name: Option<String>,
    pub(crate) expected_dimension: Option<usize>,
}

impl PineconeIndex {
    pub fn builder() -> PineconeIndexBuilder {
        PineconeIndexBuilder::new()
    }

    pub(crate) fn new(
        client: PineconeHttpClient,
        namespace: Option<String>,
        index_name: Option<String>,
        expected_dimension: Option<usize>,
    ) -> Self {
        Self {
            client,
            namespace,
            index_name,
            expected_dimension,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn index_name(&self) -> Option<&str> {
        self.index_name.as_deref()
    }

    /// Compares the index dimension with the configured embedding dimension.
    /// Only ever logs; a mismatch or an unreachable index does not fail startup.
    pub(crate) async fn validate_dimension_on_init(&self) {
        let Some(expected) = self.expected_dimension else {
            tracing::warn!("pinecone dimension validation requested without expected_dimension");
            return;
        };

        let response = self
            .client
            .post_typed::<Value, IndexStatsResponse>(
                "/describe_index_stats",
                &Value::Object(serde_json::Map::new()),
                None,
            )
            .await;

        match response {
            Ok(stats) => match stats.dimension {
                Some(index_dim) if index_dim != expected => {
                    tracing::warn!(
                        index_name = ?self.index_name,
                        namespace = ?self.namespace,
                        index_dim = index_dim,
                        embedder_dim = expected,
                        "embedder dimension differs from pinecone index dimension"
                    );
                }
                Some(_) => {}
                None => {
                    tracing::warn!("pinecone describe_index_stats response missing 'dimension'");
                }
            },
            Err(err) => {
                tracing::warn!(error = %err, "failed to validate pinecone index dimension");
            }
        }
    }

    pub async fn query_records(
        &self,
        embedding: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<RetrievedRecord>, PineconeError> {
        if let Some(expected) = self.expected_dimension {
            if embedding.len() != expected {
                return Err(PineconeError::DimensionMismatch {
                    expected,
                    got: embedding.len(),
                });
            }
        }

        let span = tracing::info_span!(
            "pinecone_query",
            index_name = ?self.index_name,
            namespace = ?self.namespace,
            top_k = top_k,
        );

        async {
            let request = QueryRequest {
                vector: embedding.to_vec(),
                top_k,
                include_metadata,
                include_values: false,
                namespace: self.namespace.clone(),
            };

            let response: QueryResponse = self
                .client
                .post_typed("/query", &request, self.namespace.as_deref())
                .await?;

            let mut output = Vec::with_capacity(response.matches.len());
            for m in response.matches {
                output.push(match_to_record(&m.id, m.score, m.metadata.as_ref())?);
            }
            tracing::debug!(matches = output.len(), "pinecone query returned");
            Ok::<_, PineconeError>(output)
        }
        .instrument(span)
        .await
    }
}

#[async_trait::async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<RetrievedRecord>, StoreError> {
        self.query_records(embedding, top_k, include_metadata)
            .await
            .map_err(StoreError::from)
    }
}
