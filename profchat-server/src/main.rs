use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use profchat_embeddings::{OpenAIConfig, OpenAiEmbedding, OpenAiHttpClient};
use profchat_llm::OpenAiClient;
use profchat_pinecone::PineconeIndex;
use profchat_rag::AugmentedChat;
use profchat_server::{router, serve, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the variables may come from the environment.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let config = ServerConfig::from_env().context("loading configuration")?;
    tracing::debug!(?config, "configuration loaded");

    let chat = build_chat(&config).await?;
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;

    serve(listener, router(chat, config.limits), shutdown_signal())
        .await
        .context("serving HTTP")?;
    tracing::info!("profchat stopped");
    Ok(())
}

async fn build_chat(config: &ServerConfig) -> anyhow::Result<AugmentedChat> {
    let openai_base = config.openai_base_url.trim_end_matches('/');

    let embedder = OpenAiEmbedding::with_client(
        OpenAiHttpClient::with_config(
            OpenAIConfig::new()
                .with_api_key(&config.openai_api_key)
                .with_api_base(format!("{openai_base}/v1")),
        ),
        &config.embedding_model,
        config.embedding_dimension,
    );

    let index = PineconeIndex::builder()
        .base_url(&config.pinecone_base_url)
        .api_key(&config.pinecone_api_key)
        .index_name(&config.pinecone_index)
        .namespace(&config.pinecone_namespace)
        .expected_dimension(config.embedding_dimension)
        .validate_dimension(true)
        .timeout(config.upstream_timeout)
        .build()
        .await
        .context("building Pinecone client")?;

    let llm = OpenAiClient::with_base_url(&config.openai_api_key, openai_base)
        .context("building chat completion client")?
        .with_model(&config.chat_model);

    AugmentedChat::builder()
        .with_embedder(Arc::new(embedder))
        .with_vector_index(Arc::new(index))
        .with_llm(Arc::new(llm))
        .with_model(&config.chat_model)
        .with_upstream_timeout(config.upstream_timeout)
        .with_stream_idle_timeout(config.stream_idle_timeout)
        .with_retrieval_policy(config.retrieval_policy)
        .build()
        .context("assembling chat pipeline")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested, draining connections");
}
