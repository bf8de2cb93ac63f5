use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use futures::{Stream, StreamExt};
use tokio::runtime::{Handle, Runtime};

use super::ensure_no_runtime;
use crate::error::Result;

/// Blocking iterator over an async stream, returned by
/// [`SyncAdapter::iter`](super::SyncAdapter::iter).
///
/// Every `next` takes the adapter lock. The stream lives on a runtime owned
/// by the iterator, since tasks spawned while polling it (such as a pooled
/// HTTP connection) belong to that runtime.
pub struct BlockingStream<S> {
    stream: Option<Pin<Box<S>>>,
    runtime: Option<Runtime>,
    lock: Arc<Mutex<()>>,
}

impl<S> BlockingStream<S> {
    pub(super) fn new(stream: S, runtime: Runtime, lock: Arc<Mutex<()>>) -> Self {
        Self {
            stream: Some(Box::pin(stream)),
            runtime: Some(runtime),
            lock,
        }
    }

    /// Whether the underlying stream has been closed.
    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Drop the stream inside its runtime's context.
    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            match &self.runtime {
                Some(runtime) => {
                    let _enter = runtime.enter();
                    drop(stream);
                }
                None => drop(stream),
            }
            tracing::trace!(target: "hybrid_http::sync", "blocking stream closed");
        }
    }
}

impl<S, I> Iterator for BlockingStream<S>
where
    S: Stream<Item = Result<I>>,
{
    type Item = Result<I>;

    fn next(&mut self) -> Option<Self::Item> {
        let (stream, runtime) = match (self.stream.as_mut(), self.runtime.as_ref()) {
            (Some(stream), Some(runtime)) => (stream, runtime),
            _ => return None,
        };
        if let Err(e) = ensure_no_runtime() {
            return Some(Err(e));
        }
        let item = {
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            runtime.block_on(stream.next())
        };
        if item.is_none() {
            self.close();
        }
        item
    }
}

impl<S> Drop for BlockingStream<S> {
    fn drop(&mut self) {
        self.close();
        if let Some(runtime) = self.runtime.take() {
            if Handle::try_current().is_ok() {
                runtime.shutdown_background();
            } else {
                drop(runtime);
            }
        }
    }
}

impl<S> std::fmt::Debug for BlockingStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingStream")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
