//! Chunked multipart uploads.
//!
//! [`upload_multipart`] is a routine: it describes the upload as effects and
//! leaves their execution to whichever driver runs it.

pub mod options;
pub mod orchestrator;
pub mod part;
pub mod session;

pub use options::{CompensationFailure, UploadOptions};
pub use orchestrator::upload_multipart;
pub use part::{is_retryable_part_status, part_retry_delay};
pub use session::{CompletedPart, PresignedUrlCache, SessionState, UploadSession};
