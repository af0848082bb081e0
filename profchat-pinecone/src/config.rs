use std::time::Duration;

use crate::client::PineconeHttpClient;
use crate::index::PineconeIndex;
use crate::PineconeError;

pub struct PineconeIndexBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    namespace: Option<String>,
    index_name: Option<String>,
    expected_dimension: Option<usize>,
    validate_dimension: bool,
    timeout: Option<Duration>,
}

impl Default for PineconeIndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PineconeIndexBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            api_key: None,
            namespace: None,
            index_name: None,
            expected_dimension: None,
            validate_dimension: false,
            timeout: None,
        }
    }

    pub fn base_url(mut self, value: impl Into<String>) -> Self {
        self.base_url = Some(value.into());
        self
    }

    pub fn api_key(mut self, value: impl Into<String>) -> Self {
        self.api_key = Some(value.into());
        self
    }

    pub fn namespace(mut self, value: impl Into<String>) -> Self {
        self.namespace = Some(value.into());
        self
    }

    pub fn index_name(mut self, value: impl Into<String>) -> Self {
        self.index_name = Some(value.into());
        self
    }

    /// Query vectors of any other length are rejected before hitting the network.
    pub fn expected_dimension(mut self, value: usize) -> Self {
        self.expected_dimension = Some(value);
        self
    }

    pub fn validate_dimension(mut self, value: bool) -> Self {
        self.validate_dimension = value;
        self
    }

    pub fn timeout(mut self, value: Duration) -> Self {
        self.timeout = Some(value);
        self
    }

    pub fn base_url_from_env(mut self, var_name: &str) -> Self {
        if let Ok(value) = std::env::var(var_name) {
            self.base_url = Some(value);
        }
        self
    }

    pub fn api_key_from_env(mut self, var_name: &str) -> Self {
        if let Ok(value) = std::env::var(var_name) {
            self.api_key = Some(value);
        }
        self
    }

    pub fn namespace_from_env(mut self, var_name: &str) -> Self {
        if let Ok(value) = std::env::var(var_name) {
            self.namespace = Some(value);
        }
        self
    }

    pub async fn build(self) -> Result<PineconeIndex, PineconeError> {
        let base_url = self
            .base_url
            .ok_or_else(|| PineconeError::Config("base_url is required".to_string()))?;
        let api_key = self
            .api_key
            .ok_or_else(|| PineconeError::Config("api_key is required".to_string()))?;
        if self.expected_dimension == Some(0) {
            return Err(PineconeError::Config(
                "expected_dimension must be greater than 0".to_string(),
            ));
        }

        let client = PineconeHttpClient::with_timeout(base_url, api_key, self.timeout)?;
        let index = PineconeIndex::new(
            client,
            self.namespace,
            self.index_name,
            self.expected_dimension,
        );
        if self.validate_dimension {
            index.validate_dimension_on_init().await;
        }
        Ok(index)
    }
}
