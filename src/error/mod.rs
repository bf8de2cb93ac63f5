//! Error Handling Module
//!
//! This module provides the error type shared by every layer of the client:
//! - Core error type (`ClientError`) and its coarse `ErrorCategory`
//! - Type conversions from common error types
//!
//! # Example
//!
//! ```rust,ignore
//! use hybrid_http::error::{ClientError, ErrorCategory};
//!
//! let error = ClientError::NestedRuntime;
//! assert_eq!(error.category(), ErrorCategory::Misuse);
//! assert!(!error.is_retryable());
//! ```

mod conversions;
pub mod types;

pub use types::*;
