//! Core data types shared across the client.
//!
//! - `value`: dynamic payloads flowing through effects
//! - `request` / `response`: transport-level HTTP messages
//! - `http`: `HttpConfig` and its builder

pub mod http;
pub mod request;
pub mod response;
pub mod value;

pub use http::{HttpConfig, HttpConfigBuilder};
pub use request::{ApiRequest, HttpRequest, RequestBody};
pub use response::HttpResponse;
pub use value::Value;
