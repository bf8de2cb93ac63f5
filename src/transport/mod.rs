//! HTTP transport abstraction.
//!
//! Transports send one [`HttpRequest`] and return the buffered
//! [`HttpResponse`], whatever its status. Failed statuses are data here; only
//! failures without a response are errors. [`RetryTransport`] layers a retry
//! strategy on top of any transport, in both the async and the blocking
//! flavor.

pub mod interceptor;
mod reqwest_transport;
pub mod retrying;

pub use reqwest_transport::{
    ReqwestBlockingTransport, ReqwestTransport, build_blocking_http_client,
    build_http_client_from_config,
};
pub use interceptor::{HeaderInterceptor, HttpInterceptor, HttpRequestContext, LoggingInterceptor};
pub use retrying::RetryTransport;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{HttpRequest, HttpResponse};

/// Async transport.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Blocking transport.
pub trait BlockingTransport: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        (**self).send(request).await
    }
}

impl<T: BlockingTransport + ?Sized> BlockingTransport for Arc<T> {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        (**self).send(request)
    }
}

static_assertions::assert_impl_all!(ReqwestTransport: Send, Sync);
static_assertions::assert_impl_all!(ReqwestBlockingTransport: Send, Sync);
static_assertions::assert_impl_all!(RetryTransport<Arc<dyn HttpTransport>>: Send, Sync);
