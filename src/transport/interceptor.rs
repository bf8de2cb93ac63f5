//! HTTP Interceptor interfaces
//!
//! Interceptors observe every attempt made by a
//! [`RetryTransport`](super::RetryTransport): they can tweak the request before it is sent,
//! observe responses, be notified of errors and of scheduled retries. The
//! hooks are best-effort and should avoid expensive work.

use std::time::Duration;

use uuid::Uuid;

use crate::error::ClientError;
use crate::observability::{format_headers_for_logging, mask_sensitive_value};
use crate::types::{HttpRequest, HttpResponse};

/// Context passed to interceptors describing the attempt.
#[derive(Clone, Debug)]
pub struct HttpRequestContext {
    /// Shared by every attempt of one logical request.
    pub request_id: Uuid,
    pub method: String,
    pub url: String,
    /// 1 for the first attempt.
    pub attempt: u32,
}

/// HTTP interceptor trait
pub trait HttpInterceptor: Send + Sync {
    /// Called before each attempt. Interceptors may add headers or modify
    /// the request, or return an error to short-circuit it.
    fn on_before_send(
        &self,
        _ctx: &HttpRequestContext,
        _request: &mut HttpRequest,
    ) -> Result<(), ClientError> {
        Ok(())
    }

    /// Called for every response received, successful or not.
    fn on_response(
        &self,
        _ctx: &HttpRequestContext,
        _response: &HttpResponse,
    ) -> Result<(), ClientError> {
        Ok(())
    }

    /// Called when sending fails without a response.
    fn on_error(&self, _ctx: &HttpRequestContext, _error: &ClientError) {}

    /// Called when a failed response is about to be retried after `delay`.
    fn on_retry(&self, _ctx: &HttpRequestContext, _response: &HttpResponse, _delay: Duration) {}
}

/// A simple logging interceptor backed by `tracing` (no sensitive data).
#[derive(Clone, Default)]
pub struct LoggingInterceptor;

impl HttpInterceptor for LoggingInterceptor {
    fn on_before_send(
        &self,
        ctx: &HttpRequestContext,
        request: &mut HttpRequest,
    ) -> Result<(), ClientError> {
        let auth = request
            .headers
            .get(reqwest::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(mask_sensitive_value);
        tracing::debug!(target: "hybrid_http::http", request_id=%ctx.request_id, method=%ctx.method, url=%ctx.url, attempt=ctx.attempt, auth=?auth, "sending request");
        if tracing::enabled!(target: "hybrid_http::http", tracing::Level::TRACE) {
            tracing::trace!(target: "hybrid_http::http", request_id=%ctx.request_id, headers=%format_headers_for_logging(&request.headers), "request headers");
        }
        Ok(())
    }

    fn on_response(
        &self,
        ctx: &HttpRequestContext,
        response: &HttpResponse,
    ) -> Result<(), ClientError> {
        tracing::debug!(target: "hybrid_http::http", request_id=%ctx.request_id, url=%ctx.url, attempt=ctx.attempt, status=response.status, bytes=response.body.len(), "response received");
        Ok(())
    }

    fn on_error(&self, ctx: &HttpRequestContext, error: &ClientError) {
        tracing::debug!(target: "hybrid_http::http", request_id=%ctx.request_id, url=%ctx.url, attempt=ctx.attempt, err=%error, "request error");
    }

    fn on_retry(&self, ctx: &HttpRequestContext, response: &HttpResponse, delay: Duration) {
        tracing::debug!(target: "hybrid_http::http", request_id=%ctx.request_id, url=%ctx.url, attempt=ctx.attempt, status=response.status, delay_ms=delay.as_millis() as u64, "retry scheduled");
    }
}

/// Adds a fixed header to every request.
#[derive(Clone, Debug)]
pub struct HeaderInterceptor {
    name: reqwest::header::HeaderName,
    value: reqwest::header::HeaderValue,
}

impl HeaderInterceptor {
    pub fn new(name: &str, value: &str) -> Result<Self, ClientError> {
        Ok(Self {
            name: reqwest::header::HeaderName::from_bytes(name.as_bytes())?,
            value: reqwest::header::HeaderValue::from_str(value)?,
        })
    }
}

impl HttpInterceptor for HeaderInterceptor {
    fn on_before_send(
        &self,
        _ctx: &HttpRequestContext,
        request: &mut HttpRequest,
    ) -> Result<(), ClientError> {
        request.headers.insert(self.name.clone(), self.value.clone());
        Ok(())
    }
}
