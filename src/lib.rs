//! # hybrid-http
//!
//! HTTP client core for a REST API with object-storage uploads.
//!
#![deny(unsafe_code)]

//! ## Features
//!
//! - **One routine, two drivers**: request logic is written once as an async
//!   routine that performs effects through a [`Co`] handle, and runs under
//!   [`drive_blocking`] or [`drive`].
//! - **Selective retries**: exponential backoff per failing status, honoring
//!   `Retry-After`.
//! - **Chunked uploads**: multipart uploads through presigned URLs, with
//!   part-level retries and abort on failure.
//! - **Sync adapter**: blocking access to async clients through
//!   [`SyncAdapter`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hybrid_http::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ClientError> {
//!     let client = Client::new(ClientConfig::builder().token("my-token").build())?;
//!
//!     let algorithms = client.request(ApiRequest::get("algorithms/")).await?;
//!     println!("{algorithms}");
//!
//!     let upload = client.upload_file("scan.mha").await?;
//!     println!("{upload}");
//!     Ok(())
//! }
//! ```
//!
//! The same upload from synchronous code:
//!
//! ```rust,no_run
//! use hybrid_http::prelude::*;
//!
//! fn main() -> Result<(), ClientError> {
//!     let client = BlockingClient::new(ClientConfig::builder().token("my-token").build())?;
//!     let upload = client.upload_file("scan.mha")?;
//!     println!("{upload}");
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod defaults;
pub mod driver;
pub mod effect;
pub mod error;
pub mod observability;
pub mod retry;
pub mod sync_support;
pub mod transport;
pub mod types;
pub mod upload;

pub use client::{BlockingClient, Client, ClientConfig, ClientConfigBuilder, RetryConfig};
pub use driver::{Co, DriveState, Execution, Step, drive, drive_blocking};
pub use effect::{Args, AsyncRoot, BlockingRoot, CallArgs, CallPath, Effect, EffectDescriptor, EffectProxy};
pub use error::{ClientError, ErrorCategory, Result};
pub use retry::{RetryStrategy, RetryStrategyFactory, SelectiveBackoffStrategy, UploadLimitStrategy};
pub use sync_support::SyncAdapter;
pub use types::{ApiRequest, HttpConfig, HttpResponse, Value};
pub use upload::{CompensationFailure, UploadOptions, upload_multipart};

/// Commonly used types and traits
pub mod prelude {
    pub use crate::client::{BlockingClient, Client, ClientConfig, RetryConfig};
    pub use crate::driver::{Co, drive, drive_blocking};
    pub use crate::effect::{Args, AsyncRoot, BlockingRoot, CallArgs, CallPath};
    pub use crate::error::{ClientError, Result};
    pub use crate::sync_support::SyncAdapter;
    pub use crate::types::{ApiRequest, HttpResponse, Value};
    pub use crate::upload::{CompensationFailure, UploadOptions};
}
