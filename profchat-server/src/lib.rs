//! HTTP surface for the professor recommendation chat.
//!
//! `POST /api/chat` takes the conversation as a JSON array of messages and
//! answers with the model's reply as a chunked `text/plain` body.

use std::future::Future;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::StreamExt;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use profchat_rag::{parse_conversation, AugmentedChat};

pub mod config;
mod error;

pub use config::{HttpLimits, ServerConfig};
pub use error::ApiError;

#[derive(Clone)]
struct AppState {
    chat: AugmentedChat,
    /// One permit per chat request, held until its body has been fully sent.
    streams: Arc<Semaphore>,
}

pub fn router(chat: AugmentedChat, limits: HttpLimits) -> Router {
    let state = AppState {
        chat,
        streams: Arc::new(Semaphore::new(limits.max_concurrency)),
    };
    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/health", get(health))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(limits.max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

async fn chat_handler(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let conversation = parse_conversation(&body).map_err(|err| {
        tracing::warn!(kind = err.kind(), error = %err, "rejected chat request");
        err
    })?;

    let permit = state.streams.try_acquire_owned().map_err(|_| {
        tracing::warn!(kind = "overloaded", "chat stream limit reached");
        ApiError::Overloaded
    })?;

    let fragments = state.chat.respond(conversation).await?;
    // The permit moves into the body and is released when the body is dropped.
    let fragments = fragments.map(move |fragment| {
        let _held = &permit;
        fragment
    });

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(fragments),
    )
        .into_response())
}

async fn health() -> &'static str {
    "ok"
}

/// Serves `app` until `shutdown` resolves, then drains in-flight requests.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "profchat listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
