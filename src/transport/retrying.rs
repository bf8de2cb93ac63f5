//! Retrying transport.
//!
//! Wraps a lower transport and consults one [`RetryStrategy`] per logical
//! request. The strategy is created lazily, on the first failed response, and
//! dropped with the request. The transport itself holds no per-request state
//! and can be shared.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use super::interceptor::{HttpInterceptor, HttpRequestContext};
use super::{BlockingTransport, HttpTransport};
use crate::error::{ClientError, Result};
use crate::retry::{RetryStrategy, RetryStrategyFactory};
use crate::types::{HttpRequest, HttpResponse};

enum Next {
    Return(HttpResponse),
    Retry(Duration),
}

/// Transport applying a retry strategy to every request it sends.
///
/// With no factory, failed responses are returned as they are.
#[derive(Clone)]
pub struct RetryTransport<T> {
    inner: T,
    factory: Option<RetryStrategyFactory>,
    interceptors: Arc<[Arc<dyn HttpInterceptor>]>,
}

impl<T> RetryTransport<T> {
    pub fn new(inner: T, factory: Option<RetryStrategyFactory>) -> Self {
        Self {
            inner,
            factory,
            interceptors: Arc::from(Vec::new()),
        }
    }

    pub fn with_interceptors(mut self, interceptors: Vec<Arc<dyn HttpInterceptor>>) -> Self {
        self.interceptors = Arc::from(interceptors);
        self
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn retries_enabled(&self) -> bool {
        self.factory.is_some()
    }

    fn context(request: &HttpRequest) -> HttpRequestContext {
        HttpRequestContext {
            request_id: Uuid::new_v4(),
            method: request.method.to_string(),
            url: request.url.clone(),
            attempt: 0,
        }
    }

    /// The request for the next attempt, after interceptors had their say.
    fn prepare(&self, ctx: &HttpRequestContext, request: &HttpRequest) -> Result<HttpRequest> {
        let mut attempt = request.clone();
        for interceptor in self.interceptors.iter() {
            interceptor.on_before_send(ctx, &mut attempt)?;
        }
        tracing::debug!(target: "hybrid_http::transport", request_id=%ctx.request_id, method=%ctx.method, url=%ctx.url, attempt=ctx.attempt, "sending");
        Ok(attempt)
    }

    fn failed(&self, ctx: &HttpRequestContext, error: ClientError) -> ClientError {
        for interceptor in self.interceptors.iter() {
            interceptor.on_error(ctx, &error);
        }
        error
    }

    fn decide(
        &self,
        ctx: &HttpRequestContext,
        strategy: &mut Option<Box<dyn RetryStrategy>>,
        response: HttpResponse,
    ) -> Result<Next> {
        for interceptor in self.interceptors.iter() {
            interceptor.on_response(ctx, &response)?;
        }
        if response.is_success() {
            return Ok(Next::Return(response));
        }
        let Some(factory) = &self.factory else {
            return Ok(Next::Return(response));
        };
        let strategy = strategy.get_or_insert_with(|| factory.create());
        match strategy.get_delay(&response) {
            None => Ok(Next::Return(response)),
            Some(delay) => {
                tracing::warn!(
                    target: "hybrid_http::transport",
                    request_id=%ctx.request_id,
                    url=%ctx.url,
                    status=response.status,
                    attempt=ctx.attempt,
                    delay_ms=delay.as_millis() as u64,
                    "retrying request"
                );
                for interceptor in self.interceptors.iter() {
                    interceptor.on_retry(ctx, &response, delay);
                }
                Ok(Next::Retry(delay))
            }
        }
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for RetryTransport<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut ctx = Self::context(&request);
        let mut strategy = None;
        loop {
            ctx.attempt += 1;
            let attempt = self.prepare(&ctx, &request)?;
            let response = match self.inner.send(attempt).await {
                Ok(response) => response,
                Err(error) => return Err(self.failed(&ctx, error)),
            };
            match self.decide(&ctx, &mut strategy, response)? {
                Next::Return(response) => return Ok(response),
                Next::Retry(delay) => tokio::time::sleep(delay).await,
            }
        }
    }
}

impl<T: BlockingTransport> BlockingTransport for RetryTransport<T> {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut ctx = Self::context(&request);
        let mut strategy = None;
        loop {
            ctx.attempt += 1;
            let attempt = self.prepare(&ctx, &request)?;
            let response = match self.inner.send(attempt) {
                Ok(response) => response,
                Err(error) => return Err(self.failed(&ctx, error)),
            };
            match self.decide(&ctx, &mut strategy, response)? {
                Next::Return(response) => return Ok(response),
                Next::Retry(delay) => std::thread::sleep(delay),
            }
        }
    }
}

impl<T> std::fmt::Debug for RetryTransport<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryTransport")
            .field("retries_enabled", &self.retries_enabled())
            .field("interceptors", &self.interceptors.len())
            .finish_non_exhaustive()
    }
}
