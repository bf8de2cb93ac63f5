//! Client configuration.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use crate::defaults;
use crate::retry::{RetryStrategyFactory, SelectiveBackoffStrategy};
use crate::transport::HttpInterceptor;
use crate::types::HttpConfig;
use crate::upload::UploadOptions;

/// How API requests are retried.
#[derive(Debug, Clone)]
pub enum RetryConfig {
    /// Failed responses are surfaced immediately.
    Disabled,
    /// [`SelectiveBackoffStrategy`] with these parameters.
    Selective {
        backoff_factor: f64,
        max_retries: u32,
    },
    /// Any strategy.
    Custom(RetryStrategyFactory),
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::Selective {
            backoff_factor: defaults::retry::BACKOFF_FACTOR,
            max_retries: defaults::retry::MAX_RETRIES,
        }
    }
}

impl RetryConfig {
    pub fn factory(&self) -> Option<RetryStrategyFactory> {
        match self {
            Self::Disabled => None,
            Self::Selective {
                backoff_factor,
                max_retries,
            } => Some(SelectiveBackoffStrategy::factory(*backoff_factor, *max_retries)),
            Self::Custom(factory) => Some(factory.clone()),
        }
    }
}

/// Configuration shared by [`Client`](super::Client) and
/// [`BlockingClient`](super::BlockingClient).
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// API token, `"<token>"` or `"<scheme> <token>"`. Read from
    /// `HYBRID_HTTP_TOKEN` when unset.
    pub token: Option<SecretString>,
    pub http: HttpConfig,
    /// Reject base and target URLs that are not `https`.
    pub require_https: bool,
    pub retry: RetryConfig,
    pub upload: UploadOptions,
    pub interceptors: Vec<Arc<dyn HttpInterceptor>>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::api::BASE_URL.to_string(),
            token: None,
            http: HttpConfig::default(),
            require_https: true,
            retry: RetryConfig::default(),
            upload: UploadOptions::default(),
            interceptors: Vec::new(),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("http", &self.http)
            .field("require_https", &self.require_https)
            .field("retry", &self.retry)
            .field("upload", &self.upload)
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(SecretString::from(token.into()));
        self
    }

    pub fn http_config(mut self, http: HttpConfig) -> Self {
        self.config.http = http;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.http.timeout = Some(timeout);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.http.headers.insert(name.into(), value.into());
        self
    }

    pub fn require_https(mut self, require: bool) -> Self {
        self.config.require_https = require;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn backoff(mut self, backoff_factor: f64, max_retries: u32) -> Self {
        self.config.retry = RetryConfig::Selective {
            backoff_factor,
            max_retries,
        };
        self
    }

    pub fn no_retries(self) -> Self {
        self.retry(RetryConfig::Disabled)
    }

    pub fn retry_strategy(self, factory: RetryStrategyFactory) -> Self {
        self.retry(RetryConfig::Custom(factory))
    }

    pub fn upload_options(mut self, options: UploadOptions) -> Self {
        self.config.upload = options;
        self
    }

    pub fn interceptor(mut self, interceptor: Arc<dyn HttpInterceptor>) -> Self {
        self.config.interceptors.push(interceptor);
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
