//! Core error types.

use thiserror::Error;

use crate::defaults::retry::RETRYABLE_STATUSES;
use crate::defaults::upload::RETRYABLE_PART_STATUSES;
use crate::types::HttpResponse;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Coarse classification of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transient network or server failure (worth retrying later).
    Transient,
    /// Non-retriable HTTP failure (4xx outside the retriable set).
    Client,
    /// The caller used the API in an unsupported way.
    Misuse,
    /// A compensating action failed after another failure.
    Compensation,
    /// Configuration or URL problems detected before sending anything.
    Configuration,
    /// Everything else (I/O, decoding, protocol violations).
    Internal,
}

/// Error type for all client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a failure status.
    #[error("HTTP {status} returned by {url}")]
    Status {
        status: u16,
        url: String,
        response: Box<HttpResponse>,
    },

    /// A single part of a multipart upload could not be stored.
    #[error("upload of part {part_number} failed after {attempts} attempt(s) with HTTP {status}")]
    PartUploadFailed {
        part_number: u32,
        attempts: u32,
        status: u16,
        response: Box<HttpResponse>,
    },

    /// Object storage accepted a part but did not report its ETag.
    #[error("upload response for part {part_number} carried no ETag header")]
    MissingEtag { part_number: u32 },

    /// A synchronous facade was used from inside a running async runtime.
    #[error(
        "Cannot use the synchronous client while an event loop is running. \
         Please use the asynchronous client in an asynchronous context."
    )]
    NestedRuntime,

    /// Aborting an upload failed after the upload itself had failed.
    #[error("aborting the upload failed ({abort}) after the upload failed: {original}")]
    CompensationFailed {
        original: Box<ClientError>,
        abort: Box<ClientError>,
    },

    /// An effect referenced something the root does not expose.
    #[error("unknown target: {0}")]
    UnknownTarget(String),

    /// An effect tried to invoke a plain value.
    #[error("target is not callable: {0}")]
    NotCallable(String),

    /// An effect was invoked with missing or ill-typed arguments.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The server answered successfully but with an unexpected payload.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// A routine suspended on something other than an effect.
    #[error("routine awaited a future that is not an effect; only `Co::perform` may suspend")]
    ForeignAwait,

    /// An internal state machine was driven out of order.
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid target URL: {0}")]
    InvalidUrl(String),

    /// The underlying transport failed before a response was received.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Build a status error from a failed response.
    pub fn status(url: impl Into<String>, response: HttpResponse) -> Self {
        Self::Status {
            status: response.status,
            url: url.into(),
            response: Box::new(response),
        }
    }

    /// The HTTP response that triggered this error, when there is one.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            Self::Status { response, .. } | Self::PartUploadFailed { response, .. } => {
                Some(response)
            }
            Self::CompensationFailed { original, .. } => original.response(),
            _ => None,
        }
    }

    /// HTTP status of the triggering response, if any.
    pub fn status_code(&self) -> Option<u16> {
        self.response().map(|r| r.status)
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Status { status, .. } if RETRYABLE_STATUSES.contains(status) => {
                ErrorCategory::Transient
            }
            Self::Status { status, .. } if *status >= 500 => ErrorCategory::Transient,
            Self::Status { .. } => ErrorCategory::Client,
            Self::PartUploadFailed { status, .. } => {
                if RETRYABLE_PART_STATUSES.contains(status) || *status >= 500 {
                    ErrorCategory::Transient
                } else {
                    ErrorCategory::Client
                }
            }
            Self::Transport(_) => ErrorCategory::Transient,
            Self::NestedRuntime | Self::ForeignAwait | Self::InvalidState(_) => {
                ErrorCategory::Misuse
            }
            Self::CompensationFailed { .. } => ErrorCategory::Compensation,
            Self::Configuration(_) | Self::InvalidUrl(_) => ErrorCategory::Configuration,
            _ => ErrorCategory::Internal,
        }
    }

    /// Whether repeating the failed operation later could succeed.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }
}
