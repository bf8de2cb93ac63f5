//! Retrying the "too many uploads" rejection.

use std::time::Duration;

use super::selective::SelectiveBackoffStrategy;
use super::strategy::{RetryStrategy, RetryStrategyFactory};
use crate::defaults;
use crate::types::HttpResponse;

const TOO_MANY_UPLOADS: &str = "you have created too many uploads";

/// Waits out the server's cap on open uploads, deferring every other
/// decision to an inner strategy.
///
/// The cap is reported as a 400 whose JSON body holds a single
/// `non_field_errors` message.
pub struct UploadLimitStrategy {
    inner: Box<dyn RetryStrategy>,
    delay: Duration,
}

impl UploadLimitStrategy {
    pub fn new(inner: Box<dyn RetryStrategy>) -> Self {
        Self {
            inner,
            delay: defaults::retry::UPLOAD_LIMIT_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Factory wrapping the default selective backoff.
    pub fn factory(backoff_factor: f64, max_retries: u32) -> RetryStrategyFactory {
        RetryStrategyFactory::new(move || {
            Self::new(Box::new(SelectiveBackoffStrategy::new(
                backoff_factor,
                max_retries,
            )))
        })
    }
}

fn is_upload_limit(response: &HttpResponse) -> bool {
    if response.status != 400 {
        return false;
    }
    let Some(body) = response.json_value() else {
        return false;
    };
    match body.get("non_field_errors").and_then(|v| v.as_array()) {
        Some(errors) if errors.len() == 1 => errors[0]
            .as_str()
            .is_some_and(|msg| msg.to_lowercase().contains(TOO_MANY_UPLOADS)),
        _ => false,
    }
}

impl RetryStrategy for UploadLimitStrategy {
    fn get_delay(&mut self, response: &HttpResponse) -> Option<Duration> {
        if is_upload_limit(response) {
            tracing::warn!(target: "hybrid_http::retry", "retrying upload due to too many uploads");
            return Some(self.delay);
        }
        self.inner.get_delay(response)
    }
}
