//! Dual-mode driver.
//!
//! A routine is an `async` body that receives a [`Co`] and suspends only in
//! [`Co::perform`]. [`drive_blocking`] resolves its effects with blocking
//! calls, [`drive`] awaits them; the routine itself is the same in both.
//!
//! ```rust,ignore
//! async fn create(co: &Co, name: &str) -> Result<Value> {
//!     co.perform(co.root().attr("uploads").attr("create").call(Args::new().kwarg("filename", name)))
//!         .await
//! }
//!
//! let a = drive_blocking(&blocking_client, |co| async move { create(&co, "a").await })?;
//! let b = drive(&client, |co| async move { create(&co, "b").await }).await?;
//! ```

mod blocking;
pub mod co;
pub mod execution;
mod nonblocking;

pub use blocking::drive_blocking;
pub use co::{Co, Perform};
pub use execution::{DriveState, Execution, Step};
pub use nonblocking::drive;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{Args, AsyncRoot, BlockingRoot, CallArgs, CallPath};
    use crate::error::{ClientError, Result};
    use crate::types::Value;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Counter service: `add(n)` returns the running total, `fail()` errors.
    #[derive(Default)]
    struct Counter {
        total: Mutex<i64>,
        log: Mutex<Vec<String>>,
    }

    impl Counter {
        fn handle(&self, path: &CallPath, args: CallArgs) -> Result<Value> {
            self.log.lock().unwrap().push(path.to_string());
            if path.is(&["add"]) {
                let n = args
                    .get("n", 0)
                    .and_then(|v| v.as_json())
                    .and_then(|v| v.as_i64())
                    .ok_or_else(|| ClientError::InvalidArgument("n".into()))?;
                let mut total = self.total.lock().unwrap();
                *total += n;
                return Ok(Value::from(json!(*total)));
            }
            if path.is(&["fail"]) {
                return Err(ClientError::Transport("refused".into()));
            }
            Err(ClientError::UnknownTarget(path.to_string()))
        }

        fn record_sleep(&self, duration: Duration) {
            self.log
                .lock()
                .unwrap()
                .push(format!("sleep {}ms", duration.as_millis()));
        }
    }

    impl BlockingRoot for Counter {
        fn invoke(&self, path: &CallPath, args: CallArgs) -> Result<Value> {
            self.handle(path, args)
        }

        fn sleep(&self, duration: Duration) {
            self.record_sleep(duration);
        }
    }

    #[async_trait]
    impl AsyncRoot for Counter {
        async fn invoke(&self, path: &CallPath, args: CallArgs) -> Result<Value> {
            self.handle(path, args)
        }

        async fn sleep(&self, duration: Duration) {
            self.record_sleep(duration);
        }
    }

    async fn add(co: &Co, n: i64) -> Result<i64> {
        let value = co
            .perform(co.root().attr("add").call(Args::new().arg(n)))
            .await?;
        value
            .as_json()
            .and_then(|v| v.as_i64())
            .ok_or_else(|| ClientError::UnexpectedResponse("not a number".into()))
    }

    async fn add_twice(co: &Co, n: i64) -> Result<i64> {
        add(co, n).await?;
        co.sleep(Duration::from_millis(5)).await?;
        add(co, n).await
    }

    async fn program(co: Co) -> Result<i64> {
        let first = add_twice(&co, 2).await?;
        let recovered = match co.perform(co.root().attr("fail").call(Args::new())).await {
            Err(ClientError::Transport(_)) => add(&co, 100).await?,
            other => panic!("unexpected: {other:?}"),
        };
        Ok(first + recovered)
    }

    #[test]
    fn blocking_driver_runs_nested_routines() {
        let counter = Counter::default();
        let result = drive_blocking(&counter, program).unwrap();
        assert_eq!(result, 4 + 104);
        assert_eq!(
            *counter.log.lock().unwrap(),
            vec!["add", "sleep 5ms", "add", "fail", "add"]
        );
    }

    #[tokio::test]
    async fn both_drivers_observe_the_same_effects() {
        let blocking = Counter::default();
        let nonblocking = Counter::default();

        let a = drive_blocking(&blocking, program).unwrap();
        let b = drive(&nonblocking, program).await.unwrap();

        assert_eq!(a, b);
        assert_eq!(
            *blocking.log.lock().unwrap(),
            *nonblocking.log.lock().unwrap()
        );
    }

    #[tokio::test]
    async fn unhandled_errors_propagate_from_both_drivers() {
        let routine = |co: Co| async move {
            co.perform(co.root().attr("fail").call(Args::new())).await?;
            Ok::<(), ClientError>(())
        };
        assert!(matches!(
            drive_blocking(&Counter::default(), routine),
            Err(ClientError::Transport(_))
        ));
        assert!(matches!(
            drive(&Counter::default(), routine).await,
            Err(ClientError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn abandoned_effects_release_the_routine() {
        let routine = |co: Co| async move {
            let mut abandoned = Box::pin(co.sleep(Duration::from_millis(50)));
            assert!(futures::poll!(abandoned.as_mut()).is_pending());
            drop(abandoned);
            add(&co, 7).await
        };

        let blocking = Counter::default();
        assert_eq!(drive_blocking(&blocking, routine).unwrap(), 7);
        assert_eq!(*blocking.log.lock().unwrap(), vec!["add"]);

        let nonblocking = Counter::default();
        assert_eq!(drive(&nonblocking, routine).await.unwrap(), 7);
        assert_eq!(*nonblocking.log.lock().unwrap(), vec!["add"]);
    }

    #[tokio::test]
    async fn foreign_awaits_fail_fast() {
        let routine = |_co: Co| async move {
            tokio::task::yield_now().await;
            Ok::<(), ClientError>(())
        };
        assert!(matches!(
            drive(&Counter::default(), routine).await,
            Err(ClientError::ForeignAwait)
        ));
    }
}
