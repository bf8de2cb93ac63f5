//! Blocking access to async-only objects.
//!
//! [`SyncAdapter`] runs each call on a fresh current-thread tokio runtime,
//! serialized by a mutex shared with every adapter derived through
//! [`SyncAdapter::nested`]. Using an adapter from inside a running runtime is
//! a hard error ([`ClientError::NestedRuntime`]), raised before any work.

mod stream;

pub use stream::BlockingStream;

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use futures::Stream;
use tokio::runtime::{Builder, Handle, Runtime};

use crate::error::{ClientError, Result};

/// Fail with [`ClientError::NestedRuntime`] when called on a runtime thread.
pub fn ensure_no_runtime() -> Result<()> {
    if Handle::try_current().is_ok() {
        Err(ClientError::NestedRuntime)
    } else {
        Ok(())
    }
}

pub(crate) fn fresh_runtime() -> Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ClientError::from)
}

/// Blocking facade over an async object.
pub struct SyncAdapter<T: ?Sized> {
    inner: Arc<T>,
    lock: Arc<Mutex<()>>,
}

impl<T> SyncAdapter<T> {
    pub fn new(inner: T) -> Result<Self> {
        Self::from_arc(Arc::new(inner))
    }
}

impl<T: ?Sized> SyncAdapter<T> {
    pub fn from_arc(inner: Arc<T>) -> Result<Self> {
        ensure_no_runtime()?;
        Ok(Self {
            inner,
            lock: Arc::new(Mutex::new(())),
        })
    }

    /// The wrapped object, for its synchronous members.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Run one async call to completion.
    pub fn call<F, Fut, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(Arc<T>) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        ensure_no_runtime()?;
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let runtime = fresh_runtime()?;
        let result = runtime.block_on(f(Arc::clone(&self.inner)));
        drop(runtime);
        result
    }

    /// Iterate an async stream.
    ///
    /// The stream is created and polled on a runtime owned by the returned
    /// iterator, and closed on exhaustion or when the iterator is dropped.
    pub fn iter<F, S, I>(&self, f: F) -> Result<BlockingStream<S>>
    where
        F: FnOnce(Arc<T>) -> S,
        S: Stream<Item = Result<I>>,
    {
        ensure_no_runtime()?;
        let runtime = fresh_runtime()?;
        let stream = {
            let _enter = runtime.enter();
            f(Arc::clone(&self.inner))
        };
        Ok(BlockingStream::new(stream, runtime, Arc::clone(&self.lock)))
    }

    /// Adapter for a sub-object, sharing this adapter's lock.
    pub fn nested<U: ?Sized>(&self, f: impl FnOnce(&T) -> Arc<U>) -> SyncAdapter<U> {
        SyncAdapter {
            inner: f(self.inner.as_ref()),
            lock: Arc::clone(&self.lock),
        }
    }
}

impl<T: ?Sized> Clone for SyncAdapter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            lock: Arc::clone(&self.lock),
        }
    }
}

impl<T: ?Sized> std::fmt::Debug for SyncAdapter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncAdapter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Service {
        calls: AtomicUsize,
        child: Arc<Child>,
    }

    struct Child {
        name: String,
    }

    impl Service {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                child: Arc::new(Child {
                    name: "child".to_string(),
                }),
            }
        }

        async fn double(&self, n: u32) -> Result<u32> {
            tokio::time::sleep(Duration::from_millis(1)).await;
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(n * 2)
        }
    }

    impl Child {
        async fn greet(&self) -> Result<String> {
            tokio::task::yield_now().await;
            Ok(format!("hello from {}", self.name))
        }
    }

    #[test]
    fn call_runs_async_methods_to_completion() {
        let adapter = SyncAdapter::new(Service::new()).unwrap();
        assert_eq!(adapter.call(|s| async move { s.double(21).await }).unwrap(), 42);
        assert_eq!(adapter.call(|s| async move { s.double(1).await }).unwrap(), 2);
        assert_eq!(adapter.get_ref().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn nested_adapters_share_the_lock() {
        let adapter = SyncAdapter::new(Service::new()).unwrap();
        let child = adapter.nested(|s| Arc::clone(&s.child));
        assert!(Arc::ptr_eq(&adapter.lock, &child.lock));
        assert_eq!(
            child.call(|c| async move { c.greet().await }).unwrap(),
            "hello from child"
        );
    }

    #[derive(Default)]
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
        total: AtomicUsize,
    }

    impl Gauge {
        async fn hold(&self) -> Result<()> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            self.total.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Station {
        gauge: Arc<Gauge>,
    }

    #[test]
    fn one_call_in_flight_per_adapter_family() {
        let adapter = SyncAdapter::new(Station {
            gauge: Arc::new(Gauge::default()),
        })
        .unwrap();
        let nested = adapter.nested(|s| Arc::clone(&s.gauge));

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let adapter = adapter.clone();
                scope.spawn(move || adapter.call(|s| async move { s.gauge.hold().await }).unwrap());
            }
            for _ in 0..4 {
                let nested = nested.clone();
                scope.spawn(move || nested.call(|g| async move { g.hold().await }).unwrap());
            }
        });

        let gauge = nested.get_ref();
        assert_eq!(gauge.total.load(Ordering::SeqCst), 8);
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn iter_yields_every_item_in_order() {
        let adapter = SyncAdapter::new(Service::new()).unwrap();
        let items: Vec<u32> = adapter
            .iter(|s| {
                async_stream::try_stream! {
                    for n in 1..=3u32 {
                        yield s.double(n).await?;
                    }
                }
            })
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(items, vec![2, 4, 6]);
        assert_eq!(adapter.get_ref().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn inside_a_runtime_construction_fails() {
        assert!(matches!(
            SyncAdapter::new(Service::new()),
            Err(ClientError::NestedRuntime)
        ));
    }

    #[test]
    fn calls_from_inside_a_runtime_fail_fast() {
        let adapter = SyncAdapter::new(Service::new()).unwrap();
        let runtime = fresh_runtime().unwrap();
        let outcome = runtime.block_on(async { adapter.call(|s| async move { s.double(1).await }) });
        assert!(matches!(outcome, Err(ClientError::NestedRuntime)));
        assert_eq!(adapter.get_ref().calls.load(Ordering::SeqCst), 0);
    }
}
