//! The retry decision interface.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::types::HttpResponse;

/// Decides whether, and after how long, a failed request is sent again.
pub trait RetryStrategy: Send {
    /// Delay before the next attempt, or `None` to surface `response`.
    fn get_delay(&mut self, response: &HttpResponse) -> Option<Duration>;
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetries;

impl RetryStrategy for NoRetries {
    fn get_delay(&mut self, _response: &HttpResponse) -> Option<Duration> {
        None
    }
}

/// Produces a fresh strategy for every logical request.
#[derive(Clone)]
pub struct RetryStrategyFactory {
    make: Arc<dyn Fn() -> Box<dyn RetryStrategy> + Send + Sync>,
}

impl RetryStrategyFactory {
    pub fn new<F, S>(make: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: RetryStrategy + 'static,
    {
        Self {
            make: Arc::new(move || Box::new(make()) as Box<dyn RetryStrategy>),
        }
    }

    pub fn create(&self) -> Box<dyn RetryStrategy> {
        (self.make)()
    }
}

impl fmt::Debug for RetryStrategyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryStrategyFactory").finish_non_exhaustive()
    }
}
