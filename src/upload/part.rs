//! Upload of a single part to object storage.

use std::time::Duration;

use bytes::Bytes;

use crate::defaults::upload::RETRYABLE_PART_STATUSES;
use crate::driver::Co;
use crate::effect::Args;
use crate::error::{ClientError, Result};

/// Whether a failed part upload may be attempted again.
pub fn is_retryable_part_status(status: u16) -> bool {
    RETRYABLE_PART_STATUSES.contains(&status) || status >= 500
}

/// Delay before retrying after the failed attempt with 0-based index
/// `failed_attempt`: `2^failed_attempt` seconds plus `jitter` in `[0, 1)`.
pub fn part_retry_delay(failed_attempt: u32, jitter: f64) -> Duration {
    let base = 2f64.powi(failed_attempt.min(30) as i32);
    let jitter = if jitter.is_finite() {
        jitter.clamp(0.0, 1.0)
    } else {
        0.0
    };
    Duration::from_secs_f64(base + jitter)
}

/// Put `data` to the presigned `url` and return the ETag the store reports.
pub async fn upload_part(
    co: &Co,
    url: &str,
    data: Bytes,
    part_number: u32,
    max_attempts: u32,
) -> Result<String> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        let put = co.root().attr("storage").attr("put").call(
            Args::new()
                .kwarg("url", url)
                .kwarg("data", data.clone()),
        );
        let response = co.perform(put).await?.into_response()?;

        if response.is_success() {
            return response
                .etag()
                .map(str::to_owned)
                .ok_or(ClientError::MissingEtag { part_number });
        }

        if !is_retryable_part_status(response.status) || attempts >= max_attempts {
            return Err(ClientError::PartUploadFailed {
                part_number,
                attempts,
                status: response.status,
                response: Box::new(response),
            });
        }

        let delay = part_retry_delay(attempts - 1, rand::random::<f64>());
        tracing::warn!(
            target: "hybrid_http::upload",
            part_number,
            attempt = attempts,
            status = response.status,
            delay_ms = delay.as_millis() as u64,
            "retrying part upload"
        );
        co.sleep(delay).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_part_status(409));
        assert!(is_retryable_part_status(423));
        assert!(is_retryable_part_status(500));
        assert!(is_retryable_part_status(503));
        assert!(!is_retryable_part_status(400));
        assert!(!is_retryable_part_status(403));
    }

    #[test]
    fn delay_doubles_with_jitter() {
        assert_eq!(part_retry_delay(0, 0.0), Duration::from_secs(1));
        assert_eq!(part_retry_delay(3, 0.5), Duration::from_secs_f64(8.5));
        assert_eq!(part_retry_delay(1, f64::NAN), Duration::from_secs(2));
    }
}
