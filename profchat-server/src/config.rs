//! Process configuration, read from environment variables.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;
use std::time::Duration;

use profchat_core::ProfchatError;
use profchat_rag::RetrievalPolicy;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;
pub const DEFAULT_PINECONE_INDEX: &str = "rag";
pub const DEFAULT_PINECONE_NAMESPACE: &str = "ns1";
pub const DEFAULT_BIND: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 3000));

/// Limits applied by the HTTP layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HttpLimits {
    pub max_body_bytes: usize,
    pub max_concurrency: usize,
}

impl Default for HttpLimits {
    fn default() -> Self {
        Self {
            max_body_bytes: 64 * 1024,
            max_concurrency: 64,
        }
    }
}

#[derive(Clone)]
pub struct ServerConfig {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub pinecone_api_key: String,
    pub pinecone_base_url: String,
    pub pinecone_index: String,
    pub pinecone_namespace: String,
    pub bind: SocketAddr,
    pub upstream_timeout: Duration,
    pub stream_idle_timeout: Duration,
    pub limits: HttpLimits,
    pub retrieval_policy: RetrievalPolicy,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ProfchatError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ProfchatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        let limits = HttpLimits::default();

        Ok(Self {
            openai_api_key: vars.required("OPENAI_API_KEY")?,
            openai_base_url: vars.or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            chat_model: vars.or("OPENAI_CHAT_MODEL", DEFAULT_CHAT_MODEL),
            embedding_model: vars.or("OPENAI_EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            embedding_dimension: vars
                .parsed("OPENAI_EMBEDDING_DIMENSION", DEFAULT_EMBEDDING_DIMENSION)?,
            pinecone_api_key: vars.required("PINECONE_API_KEY")?,
            pinecone_base_url: vars.required("PINECONE_BASE_URL")?,
            pinecone_index: vars.or("PINECONE_INDEX", DEFAULT_PINECONE_INDEX),
            pinecone_namespace: vars.or("PINECONE_NAMESPACE", DEFAULT_PINECONE_NAMESPACE),
            bind: vars.parsed("PROFCHAT_BIND", DEFAULT_BIND)?,
            upstream_timeout: Duration::from_secs(
                vars.parsed("PROFCHAT_UPSTREAM_TIMEOUT_SECS", 30)?,
            ),
            stream_idle_timeout: Duration::from_secs(
                vars.parsed("PROFCHAT_STREAM_IDLE_TIMEOUT_SECS", 60)?,
            ),
            limits: HttpLimits {
                max_body_bytes: vars.parsed("PROFCHAT_MAX_BODY_BYTES", limits.max_body_bytes)?,
                max_concurrency: vars.parsed("PROFCHAT_MAX_CONCURRENCY", limits.max_concurrency)?,
            },
            retrieval_policy: if vars.parsed("PROFCHAT_ALLOW_UNAUGMENTED", false)? {
                RetrievalPolicy::Degrade
            } else {
                RetrievalPolicy::Strict
            },
        })
        .and_then(Self::validated)
    }

    fn validated(self) -> Result<Self, ProfchatError> {
        if self.embedding_dimension == 0 {
            return Err(ProfchatError::InvalidConfig(
                "OPENAI_EMBEDDING_DIMENSION must be greater than 0".to_string(),
            ));
        }
        if self.limits.max_concurrency == 0 {
            return Err(ProfchatError::InvalidConfig(
                "PROFCHAT_MAX_CONCURRENCY must be greater than 0".to_string(),
            ));
        }
        if self.upstream_timeout.is_zero() || self.stream_idle_timeout.is_zero() {
            return Err(ProfchatError::InvalidConfig(
                "timeouts must be at least one second".to_string(),
            ));
        }
        Ok(self)
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("openai_api_key", &"<redacted>")
            .field("openai_base_url", &self.openai_base_url)
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .field("embedding_dimension", &self.embedding_dimension)
            .field("pinecone_api_key", &"<redacted>")
            .field("pinecone_base_url", &self.pinecone_base_url)
            .field("pinecone_index", &self.pinecone_index)
            .field("pinecone_namespace", &self.pinecone_namespace)
            .field("bind", &self.bind)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("stream_idle_timeout", &self.stream_idle_timeout)
            .field("limits", &self.limits)
            .field("retrieval_policy", &self.retrieval_policy)
            .finish()
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ProfchatError> {
        self.get(key)
            .ok_or_else(|| ProfchatError::InvalidConfig(format!("{key} is required")))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ProfchatError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw.parse().map_err(invalid(key)),
            None => Ok(default),
        }
    }
}

fn invalid<E: fmt::Display>(key: &str) -> impl FnOnce(E) -> ProfchatError + '_ {
    move |err| ProfchatError::InvalidConfig(format!("invalid {key}: {err}"))
}
