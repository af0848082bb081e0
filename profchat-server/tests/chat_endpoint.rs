use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use futures::stream::{self, BoxStream, StreamExt};
use http_body_util::BodyExt;
use tower::ServiceExt;

use profchat_core::{
    Embedding, EmbeddingError, LlmRequest, LlmResponse, ProfchatError, RetrievedRecord, Runnable,
    StoreError, StreamEvent, VectorIndex,
};
use profchat_rag::AugmentedChat;
use profchat_server::{router, HttpLimits};

#[derive(Default)]
struct Calls {
    embed: AtomicUsize,
    query: AtomicUsize,
    complete: AtomicUsize,
}

struct StubEmbedder {
    calls: Arc<Calls>,
    fail: bool,
}

#[async_trait]
impl Embedding for StubEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.embed.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(EmbeddingError::Provider("invalid api key".to_string()))
        } else {
            Ok(vec![0.1, 0.2, 0.3])
        }
    }

    fn dimension(&self) -> usize {
        3
    }
}

struct StubIndex {
    calls: Arc<Calls>,
    records: Vec<RetrievedRecord>,
}

#[async_trait]
impl VectorIndex for StubIndex {
    async fn query(
        &self,
        _embedding: &[f32],
        _top_k: usize,
        _include_metadata: bool,
    ) -> Result<Vec<RetrievedRecord>, StoreError> {
        self.calls.query.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.clone())
    }
}

struct StubLlm {
    calls: Arc<Calls>,
    items: Vec<Result<&'static str, &'static str>>,
    /// Keep the stream open after the scripted items.
    stall: bool,
}

#[async_trait]
impl Runnable<LlmRequest, LlmResponse> for StubLlm {
    async fn invoke(&self, _input: LlmRequest) -> Result<LlmResponse, ProfchatError> {
        Err(ProfchatError::Custom("streaming only".to_string()))
    }

    fn stream(&self, _input: LlmRequest) -> BoxStream<'_, Result<StreamEvent, ProfchatError>> {
        self.calls.complete.fetch_add(1, Ordering::SeqCst);
        let items: Vec<_> = self
            .items
            .iter()
            .map(|item| match item {
                Ok(text) => Ok(StreamEvent::ContentChunk(text.to_string())),
                Err(message) => Err(ProfchatError::LlmProvider(message.to_string())),
            })
            .collect();
        if self.stall {
            stream::iter(items).chain(stream::pending()).boxed()
        } else {
            stream::iter(items).boxed()
        }
    }
}

struct Harness {
    calls: Arc<Calls>,
    app: Router,
}

fn harness(
    embed_fails: bool,
    records: Vec<RetrievedRecord>,
    items: Vec<Result<&'static str, &'static str>>,
) -> Harness {
    harness_with(embed_fails, records, items, false, 4)
}

fn harness_with(
    embed_fails: bool,
    records: Vec<RetrievedRecord>,
    items: Vec<Result<&'static str, &'static str>>,
    stall: bool,
    max_concurrency: usize,
) -> Harness {
    let calls = Arc::new(Calls::default());
    let chat = AugmentedChat::builder()
        .with_embedder(Arc::new(StubEmbedder {
            calls: calls.clone(),
            fail: embed_fails,
        }))
        .with_vector_index(Arc::new(StubIndex {
            calls: calls.clone(),
            records,
        }))
        .with_llm(Arc::new(StubLlm {
            calls: calls.clone(),
            items,
            stall,
        }))
        .build()
        .expect("chat builds");
    Harness {
        calls,
        app: router(
            chat,
            HttpLimits {
                max_body_bytes: 1024,
                max_concurrency,
            },
        ),
    }
}

fn records() -> Vec<RetrievedRecord> {
    vec![RetrievedRecord::new("Dr. Alice Smith", 0.92)
        .with_metadata("subject", "Biology")
        .with_metadata("stars", 5)
        .with_metadata("review", "Makes genetics easy.")]
}

fn happy() -> Harness {
    harness(false, records(), vec![Ok("Top "), Ok("3 "), Ok("professors...")])
}

fn post_chat(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn error_body(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn streams_plain_text_answer() {
    let Harness { calls, app } = happy();

    let response = app
        .oneshot(post_chat(
            r#"[{"role":"user","content":"easy biology professor"}]"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"Top 3 professors...");
    assert_eq!(calls.embed.load(Ordering::SeqCst), 1);
    assert_eq!(calls.query.load(Ordering::SeqCst), 1);
    assert_eq!(calls.complete.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalid_conversations_get_400_without_upstream_calls() {
    for body in [
        "[]",
        "{\"role\":\"user\"}",
        r#"[{"role":"user","content":""}]"#,
        r#"[{"role":"user","content":"hi"},{"role":"assistant","content":"hello"}]"#,
    ] {
        let Harness { calls, app } = happy();
        let response = app.oneshot(post_chat(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        let json = error_body(response).await;
        assert_eq!(json["error"]["kind"], "invalid_request");
        assert!(json["error"]["message"].is_string());
        assert_eq!(calls.embed.load(Ordering::SeqCst), 0);
        assert_eq!(calls.query.load(Ordering::SeqCst), 0);
        assert_eq!(calls.complete.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn embedding_failure_is_500_with_kind() {
    let Harness { calls, app } = harness(true, records(), vec![Ok("never")]);

    let response = app
        .oneshot(post_chat(r#"[{"role":"user","content":"biology"}]"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_body(response).await["error"]["kind"], "embedding_unavailable");
    assert_eq!(calls.query.load(Ordering::SeqCst), 0);
    assert_eq!(calls.complete.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn no_matches_is_500_with_kind() {
    let Harness { app, .. } = harness(false, Vec::new(), vec![Ok("never")]);

    let response = app
        .oneshot(post_chat(r#"[{"role":"user","content":"biology"}]"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_body(response).await["error"]["kind"], "no_matches");
}

#[tokio::test]
async fn completion_failure_before_first_fragment_is_500() {
    let Harness { app, .. } = harness(false, records(), vec![Err("rate limited")]);

    let response = app
        .oneshot(post_chat(r#"[{"role":"user","content":"biology"}]"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = error_body(response).await;
    assert_eq!(json["error"]["kind"], "completion_failed");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("rate limited"));
}

#[tokio::test]
async fn mid_stream_failure_aborts_the_body() {
    let Harness { app, .. } = harness(false, records(), vec![Ok("Top "), Err("connection reset")]);

    let response = app
        .oneshot(post_chat(r#"[{"role":"user","content":"biology"}]"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.into_body().collect().await.is_err());
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let Harness { calls, app } = happy();
    let huge = format!(r#"[{{"role":"user","content":"{}"}}]"#, "a".repeat(4096));

    let response = app.oneshot(post_chat(huge)).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(calls.embed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn health_answers_ok() {
    let Harness { app, .. } = happy();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn chat_route_only_accepts_post() {
    let Harness { app, .. } = happy();

    let response = app
        .oneshot(Request::builder().uri("/api/chat").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn open_streams_count_against_the_concurrency_limit() {
    let Harness { calls, app } = harness_with(false, records(), vec![Ok("Top ")], true, 1);
    let question = r#"[{"role":"user","content":"biology"}]"#;

    let first = app.clone().oneshot(post_chat(question)).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let mut first_body = first.into_body();
    let chunk = first_body.frame().await.unwrap().unwrap().into_data().unwrap();
    assert_eq!(&chunk[..], b"Top ");

    // The first body is still open, so its slot is still taken.
    let second = app.clone().oneshot(post_chat(question)).await.unwrap();
    assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_body(second).await["error"]["kind"], "overloaded");
    assert_eq!(calls.embed.load(Ordering::SeqCst), 1);

    drop(first_body);
    let third = app.oneshot(post_chat(question)).await.unwrap();
    assert_eq!(third.status(), StatusCode::OK);
    assert_eq!(calls.embed.load(Ordering::SeqCst), 2);
}
