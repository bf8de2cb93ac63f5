//! Upload options.

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{ClientError, Result};

/// What to report when aborting a failed upload fails as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompensationFailure {
    /// Report both errors as [`ClientError::CompensationFailed`].
    #[default]
    Chain,
    /// Report the abort error alone.
    SurfaceAbort,
}

/// Tuning of the chunked multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadOptions {
    /// Bytes per part. Object stores require at least 5 MiB for every part
    /// but the last.
    pub chunk_size: usize,
    /// Presigned URLs requested per batch.
    pub presigned_url_batch_size: u32,
    /// Attempts per part, including the first.
    pub max_part_retry_attempts: u32,
    pub compensation: CompensationFailure,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            chunk_size: defaults::upload::CHUNK_SIZE,
            presigned_url_batch_size: defaults::upload::PRESIGNED_URL_BATCH_SIZE,
            max_part_retry_attempts: defaults::upload::MAX_PART_RETRY_ATTEMPTS,
            compensation: CompensationFailure::Chain,
        }
    }
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_presigned_url_batch_size(mut self, batch_size: u32) -> Self {
        self.presigned_url_batch_size = batch_size;
        self
    }

    pub fn with_max_part_retry_attempts(mut self, attempts: u32) -> Self {
        self.max_part_retry_attempts = attempts;
        self
    }

    pub fn with_compensation(mut self, compensation: CompensationFailure) -> Self {
        self.compensation = compensation;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ClientError::InvalidArgument(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.presigned_url_batch_size == 0 {
            return Err(ClientError::InvalidArgument(
                "presigned_url_batch_size must be at least 1".to_string(),
            ));
        }
        if self.max_part_retry_attempts == 0 {
            return Err(ClientError::InvalidArgument(
                "max_part_retry_attempts must be at least 1".to_string(),
            ));
        }
        if self.chunk_size < defaults::upload::MIN_RECOMMENDED_CHUNK_SIZE {
            tracing::debug!(
                target: "hybrid_http::upload",
                chunk_size = self.chunk_size,
                "chunk size below the 5 MiB minimum most object stores enforce"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = UploadOptions::default();
        assert_eq!(options.chunk_size, 32 * 1024 * 1024);
        assert_eq!(options.presigned_url_batch_size, 5);
        assert_eq!(options.max_part_retry_attempts, 10);
        assert_eq!(options.compensation, CompensationFailure::Chain);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn zero_values_are_rejected() {
        assert!(UploadOptions::new().with_chunk_size(0).validate().is_err());
        assert!(
            UploadOptions::new()
                .with_presigned_url_batch_size(0)
                .validate()
                .is_err()
        );
        assert!(
            UploadOptions::new()
                .with_max_part_retry_attempts(0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let options: UploadOptions =
            serde_json::from_str(r#"{"chunk_size": 10, "compensation": "surface_abort"}"#).unwrap();
        assert_eq!(options.chunk_size, 10);
        assert_eq!(options.presigned_url_batch_size, 5);
        assert_eq!(options.compensation, CompensationFailure::SurfaceAbort);
    }
}
