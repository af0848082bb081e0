#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use profchat_core::{
    Embedding, EmbeddingError, LlmRequest, LlmResponse, ProfchatError, RetrievedRecord, Runnable,
    StoreError, StreamEvent, VectorIndex,
};
use profchat_rag::AugmentedChat;

pub enum EmbedBehavior {
    Vector(Vec<f32>),
    Fail,
    Hang,
}

pub struct FakeEmbedder {
    behavior: EmbedBehavior,
    pub calls: AtomicUsize,
    pub inputs: Mutex<Vec<String>>,
}

impl FakeEmbedder {
    pub fn new(behavior: EmbedBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedding for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(text.to_string());
        match &self.behavior {
            EmbedBehavior::Vector(vector) => Ok(vector.clone()),
            EmbedBehavior::Fail => Err(EmbeddingError::InvalidResponse(
                "missing embedding".to_string(),
            )),
            EmbedBehavior::Hang => futures::future::pending().await,
        }
    }

    fn dimension(&self) -> usize {
        3
    }
}

pub enum IndexBehavior {
    Records(Vec<RetrievedRecord>),
    Fail,
    Hang,
}

pub struct FakeIndex {
    behavior: IndexBehavior,
    pub calls: AtomicUsize,
    pub queries: Mutex<Vec<(Vec<f32>, usize, bool)>>,
}

impl FakeIndex {
    pub fn new(behavior: IndexBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndex for FakeIndex {
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<RetrievedRecord>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries
            .lock()
            .unwrap()
            .push((embedding.to_vec(), top_k, include_metadata));
        match &self.behavior {
            IndexBehavior::Records(records) => Ok(records.clone()),
            IndexBehavior::Fail => Err(StoreError::Internal("connection refused".into())),
            IndexBehavior::Hang => futures::future::pending().await,
        }
    }
}

/// One scripted upstream item.
#[derive(Clone)]
pub enum Step {
    Chunk(&'static str),
    Fail(&'static str),
    /// Never yields again.
    Stall,
}

pub struct FakeLlm {
    script: Vec<Step>,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl FakeLlm {
    pub fn new(script: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn chunks(chunks: &[&'static str]) -> Arc<Self> {
        Self::new(chunks.iter().copied().map(Step::Chunk).collect())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> LlmRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("llm was called")
    }
}

#[async_trait]
impl Runnable<LlmRequest, LlmResponse> for FakeLlm {
    async fn invoke(&self, input: LlmRequest) -> Result<LlmResponse, ProfchatError> {
        let mut content = String::new();
        let mut events = self.stream(input);
        while let Some(event) = events.next().await {
            if let StreamEvent::ContentChunk(chunk) = event? {
                content.push_str(&chunk);
            }
        }
        Ok(LlmResponse { content })
    }

    fn stream(&self, input: LlmRequest) -> BoxStream<'_, Result<StreamEvent, ProfchatError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(input);

        let mut items = Vec::new();
        let mut accumulated = String::new();
        for step in &self.script {
            match step {
                Step::Chunk(text) => {
                    accumulated.push_str(text);
                    items.push(Ok(StreamEvent::ContentChunk(text.to_string())));
                }
                Step::Fail(message) => {
                    items.push(Err(ProfchatError::LlmProvider(message.to_string())));
                    return stream::iter(items).boxed();
                }
                Step::Stall => return stream::iter(items).chain(stream::pending()).boxed(),
            }
        }
        items.push(Ok(StreamEvent::FinalAnswer(accumulated)));
        stream::iter(items).boxed()
    }
}

pub fn professor(id: &str, subject: &str, stars: u8, review: &str) -> RetrievedRecord {
    RetrievedRecord::new(id, 0.9)
        .with_metadata("subject", subject)
        .with_metadata("stars", stars)
        .with_metadata("review", review)
}

pub fn three_professors() -> Vec<RetrievedRecord> {
    vec![
        professor("Dr. Alice Smith", "Biology", 5, "Makes genetics easy."),
        professor("Dr. Ben Ortiz", "Biology", 4, "Fair exams."),
        professor("Dr. Carla Nguyen", "Ecology", 4, "Lots of field trips."),
    ]
}

pub fn chat(embedder: Arc<FakeEmbedder>, index: Arc<FakeIndex>, llm: Arc<FakeLlm>) -> AugmentedChat {
    AugmentedChat::builder()
        .with_embedder(embedder)
        .with_vector_index(index)
        .with_llm(llm)
        .build()
        .expect("chat should build")
}
