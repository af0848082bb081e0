use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::PineconeError;

const API_VERSION: &str = "2024-07";

#[derive(Clone, Debug)]
pub struct PineconeHttpClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl PineconeHttpClient {
    pub fn new(base_url: String, api_key: String) -> Result<Self, PineconeError> {
        Self::with_timeout(base_url, api_key, None)
    }

    pub fn with_timeout(
        base_url: String,
        api_key: String,
        timeout: Option<Duration>,
    ) -> Result<Self, PineconeError> {
        if api_key.trim().is_empty() {
            return Err(PineconeError::Config("api_key cannot be empty".to_string()));
        }

        reqwest::Url::parse(&base_url)
            .map_err(|err| PineconeError::Config(format!("invalid base_url: {err}")))?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| PineconeError::Config(format!("http client: {err}")))?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    pub async fn post_json(&self, path: &str, payload: &Value) -> Result<Value, PineconeError> {
        self.post_typed(path, payload, None).await
    }

    pub async fn post_typed<Req, Resp>(
        &self,
        path: &str,
        payload: &Req,
        namespace: Option<&str>,
    ) -> Result<Resp, PineconeError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let response = self
            .http
            .post(url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(payload)
            .send()
            .await
            .map_err(|err| PineconeError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<Resp>()
                .await
                .map_err(|err| PineconeError::Malformed(err.to_string()));
        }

        let retry_after_seconds = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body: Value = response
            .json::<Value>()
            .await
            .unwrap_or_else(|_| Value::String(String::new()));
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| body.get("error").and_then(Value::as_str))
            .or_else(|| {
                body.get("error")
                    .and_then(|error| error.get("message"))
                    .and_then(Value::as_str)
            })
            .unwrap_or("unknown pinecone error")
            .to_string();

        Err(PineconeError::Api {
            status: status.as_u16(),
            message,
            retry_after_seconds,
            namespace: namespace.map(ToOwned::to_owned),
        })
    }
}
