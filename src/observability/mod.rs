//! Tracing utilities
//!
//! The library only emits `tracing` events (targets under `hybrid_http::`);
//! it never installs a subscriber on its own. Applications that want output
//! can call [`init_tracing`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use hybrid_http::observability::{init_tracing, OutputFormat, TracingConfig};
//!
//! init_tracing(TracingConfig::default())?;
//!
//! let config = TracingConfig::builder()
//!     .log_level(tracing::Level::DEBUG)
//!     .output_format(OutputFormat::Json)
//!     .build();
//! init_tracing(config)?;
//! ```

use crate::error::{ClientError, Result};

/// Output format for tracing logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format
    Json,
    /// Compact JSON format
    JsonCompact,
}

/// Configuration for the tracing subscriber
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level applied to this crate's targets
    pub log_level: tracing::Level,
    pub output_format: OutputFormat,
    /// Use `RUST_LOG` instead of `log_level` when it is set
    pub respect_env: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_level: tracing::Level::INFO,
            output_format: OutputFormat::Text,
            respect_env: true,
        }
    }
}

impl TracingConfig {
    pub fn builder() -> TracingConfigBuilder {
        TracingConfigBuilder::default()
    }

    /// Debug-level text output for this crate
    pub fn debug() -> Self {
        Self {
            log_level: tracing::Level::DEBUG,
            ..Self::default()
        }
    }

    fn filter_directive(&self) -> String {
        let level = self.log_level.as_str().to_lowercase();
        format!("hybrid_http={level}")
    }
}

/// Builder for TracingConfig
#[derive(Debug, Default)]
pub struct TracingConfigBuilder {
    log_level: Option<tracing::Level>,
    output_format: Option<OutputFormat>,
    respect_env: Option<bool>,
}

impl TracingConfigBuilder {
    pub fn log_level(mut self, level: tracing::Level) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Set the log level from a string
    pub fn log_level_str(mut self, level: &str) -> Result<Self> {
        let level = level.parse::<tracing::Level>().map_err(|_| {
            ClientError::Configuration(format!(
                "Invalid log level: {level}. Valid options: trace, debug, info, warn, error"
            ))
        })?;
        self.log_level = Some(level);
        Ok(self)
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn respect_env(mut self, respect: bool) -> Self {
        self.respect_env = Some(respect);
        self
    }

    pub fn build(self) -> TracingConfig {
        TracingConfig {
            log_level: self.log_level.unwrap_or(tracing::Level::INFO),
            output_format: self.output_format.unwrap_or_default(),
            respect_env: self.respect_env.unwrap_or(true),
        }
    }
}

/// Install a global `tracing-subscriber` formatter.
///
/// Succeeds without changes when a global subscriber is already installed.
pub fn init_tracing(config: TracingConfig) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = if config.respect_env {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()))
    } else {
        EnvFilter::new(config.filter_directive())
    };

    let init_result = match config.output_format {
        OutputFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .json()
            .try_init(),
        OutputFormat::JsonCompact => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .flatten_event(true)
            .try_init(),
        OutputFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };

    match init_result {
        Ok(()) => Ok(()),
        Err(e) => {
            let message = e.to_string();
            if message.contains("already been set") {
                Ok(())
            } else {
                Err(ClientError::Configuration(format!(
                    "Failed to initialize tracing: {e}"
                )))
            }
        }
    }
}

/// Shorten a credential so it can be logged.
pub fn mask_sensitive_value(value: &str) -> String {
    let (scheme, secret) = match value.split_once(' ') {
        Some((scheme, secret)) => (Some(scheme), secret),
        None => (None, value),
    };
    let chars: Vec<char> = secret.chars().collect();
    let masked = if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "***".to_string()
    };
    match scheme {
        Some(scheme) => format!("{scheme} {masked}"),
        None => masked,
    }
}

/// Render headers as JSON with credentials masked.
pub fn format_headers_for_logging(headers: &reqwest::header::HeaderMap) -> String {
    let map: std::collections::BTreeMap<&str, String> = headers
        .iter()
        .map(|(k, v)| {
            let value = v.to_str().unwrap_or("<invalid>");
            let name = k.as_str();
            let masked = if name.contains("authorization")
                || name.contains("key")
                || name.contains("token")
                || name.contains("cookie")
            {
                mask_sensitive_value(value)
            } else {
                value.to_string()
            };
            (name, masked)
        })
        .collect();
    serde_json::to_string(&map).unwrap_or_else(|_| format!("{map:?}"))
}
