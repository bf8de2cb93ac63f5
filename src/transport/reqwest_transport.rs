//! `reqwest`-backed transports.
//!
//! A timeout is not an error here: it becomes a synthetic `504` response
//! marked with [`TIMEOUT_MARKER_HEADER`], so the retry layer treats it like
//! any other gateway timeout.

use async_trait::async_trait;

use super::{BlockingTransport, HttpTransport};
use crate::defaults::http::TIMEOUT_MARKER_HEADER;
use crate::error::{ClientError, Result};
use crate::types::{HttpConfig, HttpRequest, HttpResponse, RequestBody};

/// Build an async HTTP client from HttpConfig
pub fn build_http_client_from_config(config: &HttpConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();

    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(connect_timeout) = config.connect_timeout {
        builder = builder.connect_timeout(connect_timeout);
    }

    if let Some(proxy_url) = &config.proxy {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| ClientError::Configuration(format!("Invalid proxy URL: {e}")))?;
        builder = builder.proxy(proxy);
    }

    if let Some(user_agent) = &config.user_agent {
        builder = builder.user_agent(user_agent);
    }

    if let Some(max_idle) = config.pool_max_idle_per_host {
        builder = builder.pool_max_idle_per_host(max_idle);
    }

    if !config.headers.is_empty() {
        builder = builder.default_headers(config.header_map()?);
    }

    builder
        .build()
        .map_err(|e| ClientError::Configuration(format!("Failed to create HTTP client: {e}")))
}

/// Build a blocking HTTP client from HttpConfig.
///
/// Must not be called from inside an async runtime.
pub fn build_blocking_http_client(config: &HttpConfig) -> Result<reqwest::blocking::Client> {
    let mut builder = reqwest::blocking::Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout);

    if let Some(proxy_url) = &config.proxy {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| ClientError::Configuration(format!("Invalid proxy URL: {e}")))?;
        builder = builder.proxy(proxy);
    }

    if let Some(user_agent) = &config.user_agent {
        builder = builder.user_agent(user_agent);
    }

    if let Some(max_idle) = config.pool_max_idle_per_host {
        builder = builder.pool_max_idle_per_host(max_idle);
    }

    if !config.headers.is_empty() {
        builder = builder.default_headers(config.header_map()?);
    }

    builder
        .build()
        .map_err(|e| ClientError::Configuration(format!("Failed to create HTTP client: {e}")))
}

fn timeout_response(url: &str) -> HttpResponse {
    HttpResponse::new(504)
        .with_header(TIMEOUT_MARKER_HEADER, "1")
        .with_url(url)
}

/// Map a send or body-read failure: timeouts become a synthetic `504`.
fn on_failure(url: &str, err: reqwest::Error) -> Result<HttpResponse> {
    if err.is_timeout() {
        tracing::debug!(target: "hybrid_http::http", %url, "request timed out");
        Ok(timeout_response(url))
    } else {
        Err(err.into())
    }
}

/// Async transport over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        build_http_client_from_config(config).map(Self::new)
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Start a request and return the unbuffered response, for streaming.
    pub async fn send_streaming(&self, request: HttpRequest) -> Result<reqwest::Response> {
        let url = request.url.clone();
        self.builder(request)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("{url}: {e}")))
    }

    fn builder(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let HttpRequest {
            method,
            url,
            headers,
            query,
            body,
        } = request;
        let mut builder = self.client.request(method, url).headers(headers);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Bytes(bytes) => builder.body(bytes),
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.clone();
        let response = match self.builder(request).send().await {
            Ok(response) => response,
            Err(err) => return on_failure(&url, err),
        };
        match HttpResponse::from_reqwest(response).await {
            Ok(response) => Ok(response),
            Err(err) => on_failure(&url, err),
        }
    }
}

/// Blocking transport over a shared `reqwest::blocking::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestBlockingTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestBlockingTransport {
    pub fn new(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        build_blocking_http_client(config).map(Self::new)
    }
}

impl BlockingTransport for ReqwestBlockingTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let HttpRequest {
            method,
            url,
            headers,
            query,
            body,
        } = request;
        let mut builder = self.client.request(method, url.as_str()).headers(headers);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Bytes(bytes) => builder.body(bytes),
        };
        let response = match builder.send() {
            Ok(response) => response,
            Err(err) => return on_failure(&url, err),
        };
        match HttpResponse::from_blocking(response) {
            Ok(response) => Ok(response),
            Err(err) => on_failure(&url, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_build_http_client_default() {
        let config = HttpConfig::default();
        assert!(build_http_client_from_config(&config).is_ok());
    }

    #[test]
    fn test_build_http_client_with_headers() {
        let config = HttpConfig::builder()
            .header("X-Custom-Header", "custom-value")
            .pool_max_idle_per_host(0)
            .build();
        assert!(build_http_client_from_config(&config).is_ok());
    }

    #[test]
    fn test_build_http_client_invalid_proxy() {
        let config = HttpConfig::builder().proxy(Some("http://[::1")).build();
        assert!(matches!(
            build_http_client_from_config(&config),
            Err(ClientError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn timeouts_become_gateway_timeouts() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::any())
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let config = HttpConfig::builder()
            .timeout(Some(Duration::from_millis(50)))
            .build();
        let transport = ReqwestTransport::from_config(&config).unwrap();
        let response = transport
            .send(HttpRequest::new(reqwest::Method::GET, server.uri()))
            .await
            .unwrap();
        assert_eq!(response.status, 504);
        assert_eq!(response.header(TIMEOUT_MARKER_HEADER), Some("1"));
    }

    #[tokio::test]
    async fn failed_statuses_are_returned_as_responses() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("PUT"))
            .respond_with(wiremock::ResponseTemplate::new(409).set_body_string("busy"))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::from_config(&HttpConfig::default()).unwrap();
        let request = HttpRequest::new(reqwest::Method::PUT, format!("{}/part", server.uri()))
            .with_body(RequestBody::Bytes(bytes::Bytes::from_static(b"abc")));
        let response = transport.send(request).await.unwrap();
        assert_eq!(response.status, 409);
        assert_eq!(response.text(), "busy");
    }

    #[test]
    fn blocking_puts_send_the_part_bytes() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("PUT", "/part")
            .match_body(mockito::Matcher::Exact("chunk-bytes".to_string()))
            .with_header("etag", "\"e1\"")
            .create();

        let transport = ReqwestBlockingTransport::from_config(&HttpConfig::default()).unwrap();
        let request = HttpRequest::new(reqwest::Method::PUT, format!("{}/part", server.url()))
            .with_body(RequestBody::Bytes(bytes::Bytes::from_static(b"chunk-bytes")));
        let response = transport.send(request).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.header("etag"), Some("\"e1\""));
        mock.assert();
    }
}
