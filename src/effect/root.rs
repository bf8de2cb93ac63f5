//! Roots: the concrete objects effects are resolved against.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::path::{CallArgs, CallPath};
use crate::error::{ClientError, Result};
use crate::types::Value;

/// A root resolved by the blocking driver.
pub trait BlockingRoot {
    /// Perform the call named by `path`.
    fn invoke(&self, path: &CallPath, args: CallArgs) -> Result<Value>;

    /// Materialize a path that is passed as an argument without being called.
    fn read(&self, path: &CallPath) -> Result<Value> {
        Err(ClientError::UnknownTarget(path.to_string()))
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// A root resolved by the async driver.
#[async_trait]
pub trait AsyncRoot: Send + Sync {
    /// Perform the call named by `path`.
    async fn invoke(&self, path: &CallPath, args: CallArgs) -> Result<Value>;

    /// Materialize a path that is passed as an argument without being called.
    async fn read(&self, path: &CallPath) -> Result<Value> {
        Err(ClientError::UnknownTarget(path.to_string()))
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

impl<R: BlockingRoot + ?Sized> BlockingRoot for &R {
    fn invoke(&self, path: &CallPath, args: CallArgs) -> Result<Value> {
        (**self).invoke(path, args)
    }

    fn read(&self, path: &CallPath) -> Result<Value> {
        (**self).read(path)
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[async_trait]
impl<R: AsyncRoot + ?Sized> AsyncRoot for Arc<R> {
    async fn invoke(&self, path: &CallPath, args: CallArgs) -> Result<Value> {
        (**self).invoke(path, args).await
    }

    async fn read(&self, path: &CallPath) -> Result<Value> {
        (**self).read(path).await
    }

    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await
    }
}
