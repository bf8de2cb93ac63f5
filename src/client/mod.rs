//! API clients.
//!
//! [`Client`] and [`BlockingClient`] expose the same surface and the same
//! effect roots: `request`, `uploads.create`, `uploads.generate_presigned_urls`,
//! `uploads.complete`, `uploads.abort` and `storage.put` can be invoked, and
//! `base_url` can be read. Routines such as
//! [`upload_multipart`](crate::upload::upload_multipart) therefore run against
//! either one.

mod api;
mod blocking;
pub mod config;
mod shared;
mod routes;

pub use api::Client;
pub use blocking::BlockingClient;
pub use config::{ClientConfig, ClientConfigBuilder, RetryConfig};
pub use shared::normalize_token;
