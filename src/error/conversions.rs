//! Type Conversions for ClientError
//!
//! This module contains From trait implementations for converting
//! common error types into ClientError.

use super::types::ClientError;

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::Configuration(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<reqwest::header::InvalidHeaderValue> for ClientError {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        Self::Configuration(format!("invalid header value: {err}"))
    }
}

impl From<reqwest::header::InvalidHeaderName> for ClientError {
    fn from(err: reqwest::header::InvalidHeaderName) -> Self {
        Self::Configuration(format!("invalid header name: {err}"))
    }
}
