//! Blocking client.

use std::future::Future;
use std::io::{Read, Seek};
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;

use super::api::file_name;
use super::config::ClientConfig;
use super::shared::ClientCore;
use super::routes::Route;
use crate::driver::{Co, drive_blocking};
use crate::effect::{BlockingRoot, CallArgs, CallPath};
use crate::error::Result;
use crate::sync_support::ensure_no_runtime;
use crate::transport::{BlockingTransport, ReqwestBlockingTransport, RetryTransport};
use crate::types::{ApiRequest, HttpResponse, Value};
use crate::upload::upload_multipart;

struct BlockingInner {
    config: ClientConfig,
    core: ClientCore,
    api: RetryTransport<Arc<dyn BlockingTransport>>,
    storage: RetryTransport<Arc<dyn BlockingTransport>>,
}

/// Blocking API client over `reqwest::blocking`.
///
/// Runs the same routines as [`Client`](super::Client), resolving their
/// effects on the calling thread. Must not be created or used from inside an
/// async runtime.
#[derive(Clone)]
pub struct BlockingClient {
    inner: Arc<BlockingInner>,
}

static_assertions::assert_impl_all!(BlockingClient: Send, Sync, Clone);

impl BlockingClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        ensure_no_runtime()?;
        let transport = ReqwestBlockingTransport::from_config(&config.http)?;
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn BlockingTransport>) -> Result<Self> {
        config.upload.validate()?;
        let core = ClientCore::new(&config)?;
        let api = RetryTransport::new(Arc::clone(&transport), config.retry.factory())
            .with_interceptors(config.interceptors.clone());
        let storage = RetryTransport::new(transport, None).with_interceptors(config.interceptors.clone());
        Ok(Self {
            inner: Arc::new(BlockingInner {
                config,
                core,
                api,
                storage,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        self.inner.core.base_url()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn request(&self, request: ApiRequest) -> Result<Value> {
        let method = request.method.clone();
        let request = self.inner.core.build_request(request)?;
        let url = request.url.clone();
        let response = self.inner.api.send(request)?;
        self.inner.core.finish(&method, &url, response)
    }

    pub fn storage_put(&self, url: &str, data: Bytes) -> Result<HttpResponse> {
        let request = self.inner.core.storage_request(url, data)?;
        self.inner.storage.send(request)
    }

    pub fn upload_fileobj<R: Read + Seek>(&self, source: R, filename: &str) -> Result<Value> {
        let options = self.inner.config.upload.clone();
        self.run(|co| async move { upload_multipart(&co, source, filename, &options).await })
    }

    pub fn upload_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let filename = file_name(path)?;
        let file = std::fs::File::open(path)?;
        self.upload_fileobj(file, &filename)
    }

    /// Run a routine to completion on this thread with this client as root.
    pub fn run<T, F, Fut>(&self, routine: F) -> Result<T>
    where
        F: FnOnce(Co) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        drive_blocking(self, routine)
    }
}

impl std::fmt::Debug for BlockingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingClient")
            .field("base_url", &self.base_url())
            .field("api", &self.inner.api)
            .finish_non_exhaustive()
    }
}

impl BlockingRoot for BlockingClient {
    fn invoke(&self, path: &CallPath, args: CallArgs) -> Result<Value> {
        match Route::parse(path, args)? {
            Route::Api(request) => self.request(request),
            Route::StoragePut { url, data } => self.storage_put(&url, data).map(Value::from),
        }
    }

    fn read(&self, path: &CallPath) -> Result<Value> {
        self.inner.core.read(path)
    }
}
