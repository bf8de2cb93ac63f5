//! State and request plumbing shared by the async and the blocking client.

use reqwest::Url;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use secrecy::ExposeSecret;

use super::config::ClientConfig;
use crate::defaults::api::{AUTH_SCHEME, TOKEN_ENV_VAR};
use crate::effect::CallPath;
use crate::error::{ClientError, Result};
use crate::types::{ApiRequest, HttpRequest, HttpResponse, RequestBody, Value};

/// Reduce `"<token>"` or `"<scheme> <token>"` to the token itself.
pub fn normalize_token(raw: &str) -> Result<String> {
    let parts: Vec<&str> = raw.split_whitespace().collect();
    match parts.as_slice() {
        [token] | [_, token] => Ok((*token).to_string()),
        [] => Err(ClientError::Configuration("Token must be set".to_string())),
        _ => Err(ClientError::Configuration("Invalid token format".to_string())),
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ClientCore {
    base_url: Url,
    auth: HeaderValue,
    require_https: bool,
}

impl ClientCore {
    pub(crate) fn new(config: &ClientConfig) -> Result<Self> {
        let raw = match &config.token {
            Some(token) if !token.expose_secret().trim().is_empty() => {
                token.expose_secret().to_string()
            }
            _ => std::env::var(TOKEN_ENV_VAR)
                .map_err(|_| ClientError::Configuration("Token must be set".to_string()))?,
        };
        let token = normalize_token(&raw)?;
        let mut auth = HeaderValue::from_str(&format!("{AUTH_SCHEME} {token}"))
            .map_err(|_| ClientError::Configuration("Invalid token format".to_string()))?;
        auth.set_sensitive(true);

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        if config.require_https && base_url.scheme() != "https" {
            return Err(ClientError::Configuration(
                "Base URL must be https".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            auth,
            require_https: config.require_https,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Absolute target of `request`, validated against the base URL.
    pub(crate) fn target_url(&self, request: &ApiRequest) -> Result<Url> {
        let url = match &request.url {
            Some(url) => Url::parse(url).map_err(|e| ClientError::InvalidUrl(format!("{url}: {e}")))?,
            None => self
                .base_url
                .join(&request.path)
                .map_err(|e| ClientError::InvalidUrl(format!("{}: {e}", request.path)))?,
        };
        self.validate_url(&url)?;
        Ok(url)
    }

    /// Targets must share the base URL's host and port, over https when
    /// required.
    pub(crate) fn validate_url(&self, url: &Url) -> Result<()> {
        let scheme_ok = !self.require_https || url.scheme() == "https";
        let same_host = url.host_str() == self.base_url.host_str()
            && url.port_or_known_default() == self.base_url.port_or_known_default();
        if scheme_ok && same_host {
            Ok(())
        } else {
            Err(ClientError::InvalidUrl(format!("Invalid target URL: {url}")))
        }
    }

    /// Presigned storage URLs live on another host; only the scheme is checked.
    pub(crate) fn validate_storage_url(&self, url: &str) -> Result<Url> {
        let parsed = Url::parse(url).map_err(|e| ClientError::InvalidUrl(format!("{url}: {e}")))?;
        if self.require_https && parsed.scheme() != "https" {
            return Err(ClientError::InvalidUrl(format!("Invalid target URL: {url}")));
        }
        Ok(parsed)
    }

    pub(crate) fn build_request(&self, request: ApiRequest) -> Result<HttpRequest> {
        let url = self.target_url(&request)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, self.auth.clone());
        if request.json.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        for (name, value) in &request.extra_headers {
            headers.insert(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }

        let body = match request.json {
            Some(json) => RequestBody::Json(json),
            None => RequestBody::Empty,
        };
        Ok(HttpRequest::new(request.method, url.as_str())
            .with_headers(headers)
            .with_query(request.params)
            .with_body(body))
    }

    pub(crate) fn storage_request(&self, url: &str, data: bytes::Bytes) -> Result<HttpRequest> {
        let url = self.validate_storage_url(url)?;
        Ok(HttpRequest::new(reqwest::Method::PUT, url.as_str()).with_body(RequestBody::Bytes(data)))
    }

    /// Turn the final response into the call's result.
    pub(crate) fn finish(&self, method: &reqwest::Method, url: &str, response: HttpResponse) -> Result<Value> {
        if !response.is_success() {
            if response.is_json() {
                tracing::error!(
                    target: "hybrid_http::client",
                    %method,
                    %url,
                    status = response.status,
                    body = %response.text(),
                    "request failed"
                );
            }
            return Err(ClientError::status(url, response));
        }
        if response.is_json() {
            Ok(Value::Json(response.json()?))
        } else {
            Ok(Value::Response(response))
        }
    }

    /// Plain attributes readable through effects.
    pub(crate) fn read(&self, path: &CallPath) -> Result<Value> {
        if path.is(&["base_url"]) {
            Ok(Value::from(self.base_url()))
        } else {
            Err(ClientError::UnknownTarget(path.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn core(base_url: &str) -> ClientCore {
        let config = ClientConfig::builder()
            .base_url(base_url)
            .token("Token  abc123")
            .build();
        ClientCore::new(&config).unwrap()
    }

    #[test]
    fn tokens_are_normalized() {
        assert_eq!(normalize_token("abc").unwrap(), "abc");
        assert_eq!(normalize_token("  Bearer   abc ").unwrap(), "abc");
        assert!(matches!(
            normalize_token("a b c"),
            Err(ClientError::Configuration(_))
        ));
        assert!(normalize_token("   ").is_err());
    }

    #[test]
    fn base_url_must_be_https() {
        let config = ClientConfig::builder()
            .base_url("http://example.test/api/")
            .token("abc")
            .build();
        assert!(matches!(
            ClientCore::new(&config),
            Err(ClientError::Configuration(_))
        ));

        let config = ClientConfig::builder()
            .base_url("http://example.test/api/")
            .token("abc")
            .require_https(false)
            .build();
        assert!(ClientCore::new(&config).is_ok());
    }

    #[test]
    fn requests_carry_auth_and_accept_headers() {
        let core = core("https://example.test/api/v1/");
        let request = core
            .build_request(
                ApiRequest::post("uploads/")
                    .json(json!({"filename": "a.mha"}))
                    .param("limit", "10")
                    .header("X-Extra", "1"),
            )
            .unwrap();
        assert_eq!(request.url, "https://example.test/api/v1/uploads/");
        assert_eq!(request.headers[AUTHORIZATION], "BEARER abc123");
        assert_eq!(request.headers[ACCEPT], "application/json");
        assert_eq!(request.headers[CONTENT_TYPE], "application/json");
        assert_eq!(request.headers["x-extra"], "1");
        assert_eq!(request.query, vec![("limit".to_string(), "10".to_string())]);
        assert_eq!(request.body, RequestBody::Json(json!({"filename": "a.mha"})));
    }

    #[test]
    fn foreign_hosts_are_rejected() {
        let core = core("https://example.test/api/v1/");
        assert!(core
            .target_url(&ApiRequest::get("").url("https://example.test/api/v1/x/"))
            .is_ok());
        for url in [
            "https://evil.test/api/v1/",
            "http://example.test/api/v1/",
            "https://example.test:8443/api/v1/",
        ] {
            assert!(matches!(
                core.target_url(&ApiRequest::get("").url(url)),
                Err(ClientError::InvalidUrl(_))
            ));
        }
    }

    #[test]
    fn storage_urls_may_use_another_host() {
        let core = core("https://example.test/api/v1/");
        let request = core
            .storage_request("https://bucket.s3.test/part?sig=1", bytes::Bytes::from_static(b"x"))
            .unwrap();
        assert!(request.headers.get(AUTHORIZATION).is_none());
        assert!(core.storage_request("http://bucket.s3.test/", bytes::Bytes::new()).is_err());
    }

    #[test]
    fn finish_decodes_json_and_keeps_other_bodies() {
        let core = core("https://example.test/api/v1/");
        let method = reqwest::Method::GET;
        let json_response = HttpResponse::new(200).with_json(&json!({"id": 1}));
        assert_eq!(
            core.finish(&method, "u", json_response).unwrap(),
            Value::Json(json!({"id": 1}))
        );

        let raw = HttpResponse::new(200).with_body("plain");
        assert!(matches!(
            core.finish(&method, "u", raw).unwrap(),
            Value::Response(_)
        ));

        let failed = HttpResponse::new(404).with_json(&json!({"detail": "Not found."}));
        let err = core.finish(&method, "u", failed).unwrap_err();
        assert_eq!(err.status_code(), Some(404));
    }

    #[test]
    fn base_url_is_readable() {
        let core = core("https://example.test/api/v1/");
        assert_eq!(
            core.read(&CallPath::root().attr("base_url")).unwrap(),
            Value::from("https://example.test/api/v1/")
        );
        assert!(core.read(&CallPath::root().attr("token")).is_err());
    }
}
