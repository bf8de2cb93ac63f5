//! Per-status exponential backoff.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::RETRY_AFTER;

use super::retry_after::parse_retry_after;
use super::strategy::{RetryStrategy, RetryStrategyFactory};
use crate::defaults;
use crate::types::HttpResponse;

/// Source of the current time, used to evaluate `Retry-After` dates.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Retries gateway, storage and rate-limit failures with exponential backoff.
///
/// Only 502, 503, 504, 507 and 429 are retried. Each status code has its own
/// counter: the k-th retry of a code waits `backoff_factor * 2^(k-1)` seconds,
/// unless the response carries a usable `Retry-After` header, which then
/// decides the delay. After `max_retries` retries of one code, that code is
/// surfaced.
#[derive(Clone)]
pub struct SelectiveBackoffStrategy {
    backoff_factor: f64,
    max_retries: u32,
    counts: HashMap<u16, u32>,
    clock: Clock,
}

impl SelectiveBackoffStrategy {
    pub fn new(backoff_factor: f64, max_retries: u32) -> Self {
        Self {
            backoff_factor,
            max_retries,
            counts: HashMap::new(),
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the clock used for HTTP-date `Retry-After` values.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Factory producing fresh strategies with these settings.
    pub fn factory(backoff_factor: f64, max_retries: u32) -> RetryStrategyFactory {
        RetryStrategyFactory::new(move || Self::new(backoff_factor, max_retries))
    }

    pub fn is_retryable(status: u16) -> bool {
        defaults::retry::RETRYABLE_STATUSES.contains(&status)
    }

    /// Retries already granted for `status`.
    pub fn retries_for(&self, status: u16) -> u32 {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    fn backoff(&self, count: u32) -> Duration {
        let exponent = i32::try_from(count).unwrap_or(i32::MAX);
        seconds_to_duration(self.backoff_factor * 2f64.powi(exponent))
    }
}

impl Default for SelectiveBackoffStrategy {
    fn default() -> Self {
        Self::new(defaults::retry::BACKOFF_FACTOR, defaults::retry::MAX_RETRIES)
    }
}

impl RetryStrategy for SelectiveBackoffStrategy {
    fn get_delay(&mut self, response: &HttpResponse) -> Option<Duration> {
        let status = response.status;
        if !Self::is_retryable(status) {
            return None;
        }
        let count = self.retries_for(status);
        if count >= self.max_retries {
            return None;
        }
        let backoff = self.backoff(count);
        self.counts.insert(status, count + 1);

        let delay = response
            .header(RETRY_AFTER.as_str())
            .and_then(|value| parse_retry_after(value, (self.clock)()))
            .unwrap_or(backoff);
        Some(delay)
    }
}

impl fmt::Debug for SelectiveBackoffStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectiveBackoffStrategy")
            .field("backoff_factor", &self.backoff_factor)
            .field("max_retries", &self.max_retries)
            .field("counts", &self.counts)
            .finish_non_exhaustive()
    }
}

/// Negative or NaN delays clamp to zero, overflowing ones saturate.
fn seconds_to_duration(seconds: f64) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn strategy() -> SelectiveBackoffStrategy {
        SelectiveBackoffStrategy::new(0.1, 8)
            .with_clock(|| Utc.with_ymd_and_hms(1999, 1, 1, 12, 0, 0).unwrap())
    }

    fn secs(values: &[f64]) -> Vec<Option<Duration>> {
        values.iter().map(|s| Some(Duration::from_secs_f64(*s))).collect()
    }

    fn run(responses: &[HttpResponse]) -> Vec<Option<Duration>> {
        let mut strategy = strategy();
        responses.iter().map(|r| strategy.get_delay(r)).collect()
    }

    fn exponential_then_stop() -> Vec<Option<Duration>> {
        let mut expected = secs(&[0.1, 0.2, 0.4, 0.8, 1.6, 3.2, 6.4, 12.8]);
        expected.extend([None, None]);
        expected
    }

    #[test]
    fn non_retryable_statuses_stop_immediately() {
        for status in [200, 401, 500, 501, 505, 506, 508, 510, 511] {
            assert_eq!(run(&[HttpResponse::new(status)]), vec![None], "status {status}");
        }
    }

    #[test]
    fn backoff_doubles_until_exhausted() {
        for status in [502, 503, 504, 507, 429] {
            let responses = vec![HttpResponse::new(status); 10];
            assert_eq!(run(&responses), exponential_then_stop(), "status {status}");
        }
    }

    #[test]
    fn counters_are_per_status() {
        let responses = [
            HttpResponse::new(502),
            HttpResponse::new(502),
            HttpResponse::new(504),
            HttpResponse::new(504),
        ];
        assert_eq!(run(&responses), secs(&[0.1, 0.2, 0.1, 0.2]));
    }

    #[test]
    fn three_unavailable_responses() {
        let responses = vec![HttpResponse::new(503); 3];
        assert_eq!(run(&responses), secs(&[0.1, 0.2, 0.4]));
    }

    #[test]
    fn garbage_retry_after_keeps_backoff() {
        let responses = vec![HttpResponse::new(429).with_header("Retry-After", "foo"); 10];
        assert_eq!(run(&responses), exponential_then_stop());
    }

    #[test]
    fn retry_after_seconds_override_backoff() {
        let responses = vec![HttpResponse::new(429).with_header("Retry-After", "120"); 10];
        let mut expected = vec![Some(Duration::from_secs(120)); 8];
        expected.extend([None, None]);
        assert_eq!(run(&responses), expected);
    }

    #[test]
    fn retry_after_dates() {
        let past =
            vec![HttpResponse::new(429).with_header("Retry-After", "Sun, 21 Oct 1990 07:28:00 GMT"); 2];
        assert_eq!(run(&past), vec![Some(Duration::ZERO); 2]);

        let future =
            vec![HttpResponse::new(429).with_header("Retry-After", "Fri, 01 Jan 1999 12:00:10 GMT"); 2];
        assert_eq!(run(&future), vec![Some(Duration::from_secs(10)); 2]);
    }

    #[test]
    fn degenerate_factors_are_clamped() {
        assert_eq!(seconds_to_duration(-1.0), Duration::ZERO);
        assert_eq!(seconds_to_duration(f64::NAN), Duration::ZERO);
        assert_eq!(seconds_to_duration(f64::INFINITY), Duration::MAX);
    }

    #[test]
    fn zero_max_retries_never_retries() {
        let mut strategy = SelectiveBackoffStrategy::new(0.1, 0);
        assert_eq!(strategy.get_delay(&HttpResponse::new(503)), None);
    }
}
