//! Retry Policy Module
//!
//! - strategy.rs: the `RetryStrategy` decision trait and its factory
//! - selective.rs: per-status exponential backoff honoring `Retry-After`
//! - retry_after.rs: `Retry-After` header parsing
//! - upload_limit.rs: extra retries for the "too many uploads" rejection
//!
//! A strategy maps the latest failed response to a delay, or `None` to stop.
//! A fresh instance is created for every logical request, so strategies keep
//! their counters in plain fields.

mod retry_after;
pub mod selective;
pub mod strategy;
pub mod upload_limit;

pub use retry_after::parse_retry_after;
pub use selective::{Clock, SelectiveBackoffStrategy};
pub use strategy::{NoRetries, RetryStrategy, RetryStrategyFactory};
pub use upload_limit::UploadLimitStrategy;
