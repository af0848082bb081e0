use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tracing::Instrument;

use profchat_core::{
    Conversation, Embedding, EmbeddingError, Llm, LlmRequest, ProfchatError, RetrievedRecord,
    StreamEvent, VectorIndex,
};

mod error;
pub mod prompt;

pub use error::{ChatError, Stage};

/// Number of records requested from the index for every question.
pub const TOP_K: usize = 3;

pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 16;
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Text fragments of one answer, in arrival order. An `Err` item is always
/// the last one.
pub type ResponseStream = ReceiverStream<Result<String, ChatError>>;

/// What to do when the index has nothing for the question.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RetrievalPolicy {
    /// Fail the request with [`ChatError::NoMatches`].
    #[default]
    Strict,
    /// Send the last message without a retrieval block.
    Degrade,
}

/// Parses a request body into a validated conversation.
pub fn parse_conversation(body: &[u8]) -> Result<Conversation, ChatError> {
    Ok(Conversation::from_json(body)?)
}

#[derive(Clone)]
pub struct AugmentedChat {
    embedder: Arc<dyn Embedding>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn Llm>,
    model: String,
    event_buffer_size: usize,
    upstream_timeout: Duration,
    stream_idle_timeout: Duration,
    retrieval_policy: RetrievalPolicy,
}

pub struct AugmentedChatBuilder {
    embedder: Option<Arc<dyn Embedding>>,
    index: Option<Arc<dyn VectorIndex>>,
    llm: Option<Arc<dyn Llm>>,
    model: String,
    event_buffer_size: usize,
    upstream_timeout: Duration,
    stream_idle_timeout: Duration,
    retrieval_policy: RetrievalPolicy,
}

impl AugmentedChat {
    pub fn builder() -> AugmentedChatBuilder {
        AugmentedChatBuilder {
            embedder: None,
            index: None,
            llm: None,
            model: String::new(),
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            stream_idle_timeout: DEFAULT_STREAM_IDLE_TIMEOUT,
            retrieval_policy: RetrievalPolicy::Strict,
        }
    }

    pub fn event_buffer_size(&self) -> usize {
        self.event_buffer_size
    }

    pub fn retrieval_policy(&self) -> RetrievalPolicy {
        self.retrieval_policy
    }

    /// Embeds the last message, retrieves matching reviews, and starts the
    /// completion. Returns once the first fragment has arrived (or the model
    /// finished without producing any), so every failure up to that point is
    /// reported here rather than inside the stream.
    pub async fn respond(&self, conversation: Conversation) -> Result<ResponseStream, ChatError> {
        let span = tracing::info_span!("augmented_chat", turns = conversation.len());
        let result = self.respond_inner(conversation).instrument(span.clone()).await;
        if let Err(err) = &result {
            span.in_scope(|| tracing::warn!(kind = err.kind(), error = %err, "chat request failed"));
        }
        result
    }

    /// Runs [`AugmentedChat::respond`] to completion and joins the fragments.
    pub async fn answer(&self, conversation: Conversation) -> Result<String, ChatError> {
        let mut stream = self.respond(conversation).await?;
        let mut answer = String::new();
        while let Some(fragment) = stream.next().await {
            answer.push_str(&fragment?);
        }
        Ok(answer)
    }

    async fn respond_inner(&self, conversation: Conversation) -> Result<ResponseStream, ChatError> {
        let embedding = self.embed(&conversation.last().content).await?;
        let records = self.retrieve(&embedding).await?;
        let messages = prompt::build_messages(&conversation, &records);
        tracing::debug!(messages = messages.len(), "prompt assembled");

        self.start_completion(LlmRequest {
            model: self.model.clone(),
            messages,
        })
        .await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ChatError> {
        let embedding = bounded(Stage::Embedding, self.upstream_timeout, self.embedder.embed(text))
            .await?
            .map_err(ChatError::EmbeddingUnavailable)?;
        if embedding.is_empty() {
            return Err(ChatError::EmbeddingUnavailable(EmbeddingError::InvalidResponse(
                "empty embedding".to_string(),
            )));
        }
        Ok(embedding)
    }

    async fn retrieve(&self, embedding: &[f32]) -> Result<Vec<RetrievedRecord>, ChatError> {
        let mut records = bounded(
            Stage::Retrieval,
            self.upstream_timeout,
            self.index.query(embedding, TOP_K, true),
        )
        .await?
        .map_err(ChatError::RetrievalFailed)?;
        records.truncate(TOP_K);
        tracing::info!(matches = records.len(), "retrieved records");

        if records.is_empty() {
            match self.retrieval_policy {
                RetrievalPolicy::Strict => return Err(ChatError::NoMatches),
                RetrievalPolicy::Degrade => {
                    tracing::warn!("no matches, answering without retrieved reviews")
                }
            }
        }
        Ok(records)
    }

    async fn start_completion(&self, request: LlmRequest) -> Result<ResponseStream, ChatError> {
        let (output_tx, output_rx) = mpsc::channel(self.event_buffer_size);
        let (started_tx, started_rx) = oneshot::channel();

        let relay = Relay {
            llm: self.llm.clone(),
            upstream_timeout: self.upstream_timeout,
            stream_idle_timeout: self.stream_idle_timeout,
        };
        let span = tracing::info_span!("chat_stream", model = %request.model);
        tokio::spawn(relay.run(request, started_tx, output_tx).instrument(span));

        match started_rx.await {
            Ok(Ok(())) => Ok(ReceiverStream::new(output_rx)),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(ChatError::CompletionFailed(ProfchatError::Custom(
                "completion task ended before starting".to_string(),
            ))),
        }
    }
}

struct Relay {
    llm: Arc<dyn Llm>,
    upstream_timeout: Duration,
    stream_idle_timeout: Duration,
}

impl Relay {
    /// Forwards content fragments into `output` until the upstream ends,
    /// fails, stalls, or the receiver goes away. `started` resolves with the
    /// outcome of the wait for the first item.
    async fn run(
        self,
        request: LlmRequest,
        started: oneshot::Sender<Result<(), ChatError>>,
        output: mpsc::Sender<Result<String, ChatError>>,
    ) {
        let mut upstream = self.llm.stream(request);
        let mut started = Some(started);
        let mut fragments = 0usize;

        loop {
            let wait = if started.is_some() {
                self.upstream_timeout
            } else {
                self.stream_idle_timeout
            };

            let item = match tokio::time::timeout(wait, upstream.next()).await {
                Ok(item) => item,
                Err(_) => {
                    match started.take() {
                        Some(tx) => {
                            let _ = tx.send(Err(ChatError::Timeout {
                                stage: Stage::Completion,
                                after: wait,
                            }));
                        }
                        None => {
                            let err = ChatError::UpstreamStream(ProfchatError::Timeout(wait));
                            tracing::warn!(kind = err.kind(), fragments, "completion stream stalled");
                            let _ = output.send(Err(err)).await;
                        }
                    }
                    return;
                }
            };

            match item {
                Some(Ok(StreamEvent::ContentChunk(text))) => {
                    if text.is_empty() {
                        continue;
                    }
                    if let Some(tx) = started.take() {
                        if tx.send(Ok(())).is_err() {
                            return;
                        }
                    }
                    fragments += 1;
                    if output.send(Ok(text)).await.is_err() {
                        tracing::debug!(fragments, "client went away, dropping completion stream");
                        return;
                    }
                }
                Some(Ok(StreamEvent::FinalAnswer(_))) => {}
                Some(Err(err)) => {
                    match started.take() {
                        Some(tx) => {
                            let _ = tx.send(Err(ChatError::CompletionFailed(err)));
                        }
                        None => {
                            let err = ChatError::UpstreamStream(err);
                            tracing::warn!(kind = err.kind(), error = %err, fragments, "completion stream failed");
                            let _ = output.send(Err(err)).await;
                        }
                    }
                    return;
                }
                None => {
                    if let Some(tx) = started.take() {
                        let _ = tx.send(Ok(()));
                    }
                    tracing::debug!(fragments, "completion stream finished");
                    return;
                }
            }
        }
    }
}

async fn bounded<T>(
    stage: Stage,
    after: Duration,
    future: impl std::future::Future<Output = T>,
) -> Result<T, ChatError> {
    tokio::time::timeout(after, future)
        .await
        .map_err(|_| ChatError::Timeout { stage, after })
}

impl AugmentedChatBuilder {
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedding>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_vector_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn Llm>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Model name sent with every completion; empty defers to the client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_event_buffer_size(mut self, event_buffer_size: usize) -> Self {
        if event_buffer_size > 0 {
            self.event_buffer_size = event_buffer_size;
        }
        self
    }

    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }

    pub fn with_stream_idle_timeout(mut self, timeout: Duration) -> Self {
        self.stream_idle_timeout = timeout;
        self
    }

    pub fn with_retrieval_policy(mut self, policy: RetrievalPolicy) -> Self {
        self.retrieval_policy = policy;
        self
    }

    pub fn build(self) -> Result<AugmentedChat, ProfchatError> {
        let missing = |what: &str| ProfchatError::InvalidConfig(format!("{what} is required"));
        Ok(AugmentedChat {
            embedder: self.embedder.ok_or_else(|| missing("embedder"))?,
            index: self.index.ok_or_else(|| missing("vector index"))?,
            llm: self.llm.ok_or_else(|| missing("llm"))?,
            model: self.model,
            event_buffer_size: self.event_buffer_size,
            upstream_timeout: self.upstream_timeout,
            stream_idle_timeout: self.stream_idle_timeout,
            retrieval_policy: self.retrieval_policy,
        })
    }
}
