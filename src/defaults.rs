//! Default Configuration Values
//!
//! This module centralizes all default values used throughout the client.
//! Having defaults in one place makes them easier to maintain, document, and adjust.

use std::time::Duration;

/// HTTP client default configurations
pub mod http {
    use super::*;

    /// Default request timeout for HTTP requests
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    /// Default connection timeout for establishing HTTP connections
    ///
    /// Set to 10 seconds which is sufficient for most network conditions
    /// while not being too aggressive.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Default User-Agent string for HTTP requests
    pub const USER_AGENT: &str = concat!("hybrid-http/", env!("CARGO_PKG_VERSION"));

    /// Header set on the synthetic `504` produced when the transport times out.
    pub const TIMEOUT_MARKER_HEADER: &str = "x-transport-timeout";
}

/// API endpoint and authentication defaults
pub mod api {
    /// Default API root. Must end with `/` so relative paths join below it.
    pub const BASE_URL: &str = "https://grand-challenge.org/api/v1/";

    /// Environment variable consulted when no token is configured.
    pub const TOKEN_ENV_VAR: &str = "HYBRID_HTTP_TOKEN";

    /// Authorization scheme sent with every API request.
    pub const AUTH_SCHEME: &str = "BEARER";
}

/// Retry policy defaults
pub mod retry {
    use super::*;

    /// Base of the exponential backoff, in seconds.
    pub const BACKOFF_FACTOR: f64 = 0.1;

    /// Retries per status code before a failure is surfaced.
    pub const MAX_RETRIES: u32 = 8;

    /// Status codes retried by the selective backoff strategy.
    pub const RETRYABLE_STATUSES: [u16; 5] = [502, 503, 504, 507, 429];

    /// Fixed delay used when the server reports too many open uploads.
    pub const UPLOAD_LIMIT_DELAY: Duration = Duration::from_secs(300);
}

/// Chunked upload defaults
pub mod upload {
    /// Size of each uploaded part (32 MiB).
    pub const CHUNK_SIZE: usize = 32 * 1024 * 1024;

    /// Smallest part size object stores accept for non-final parts (5 MiB).
    pub const MIN_RECOMMENDED_CHUNK_SIZE: usize = 5 * 1024 * 1024;

    /// Presigned URLs requested per batch.
    pub const PRESIGNED_URL_BATCH_SIZE: u32 = 5;

    /// Attempts per part before the upload is aborted.
    pub const MAX_PART_RETRY_ATTEMPTS: u32 = 10;

    /// Statuses from object storage that are worth retrying for a part.
    pub const RETRYABLE_PART_STATUSES: [u16; 2] = [409, 423];
}
