//! Async client.

use std::future::Future;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use tokio::runtime::{Handle, RuntimeFlavor};

use super::config::ClientConfig;
use super::shared::ClientCore;
use super::routes::Route;
use crate::driver::{Co, drive};
use crate::effect::{AsyncRoot, CallArgs, CallPath};
use crate::error::{ClientError, Result};
use crate::sync_support::SyncAdapter;
use crate::transport::{HttpTransport, ReqwestTransport, RetryTransport};
use crate::types::{ApiRequest, HttpResponse, Value};
use crate::upload::upload_multipart;

struct ClientInner {
    config: ClientConfig,
    core: ClientCore,
    api: RetryTransport<Arc<dyn HttpTransport>>,
    storage: RetryTransport<Arc<dyn HttpTransport>>,
    streaming: ReqwestTransport,
    custom_transport: Option<Arc<dyn HttpTransport>>,
}

/// Async API client.
///
/// Cheap to clone; clones share the connection pool. Also an [`AsyncRoot`],
/// so routines written against [`Co`] can be run with [`Client::run`].
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

static_assertions::assert_impl_all!(Client: Send, Sync, Clone);

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Client over a custom transport. Download streams still use `reqwest`.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        Self::build(config, Some(transport))
    }

    fn build(config: ClientConfig, custom_transport: Option<Arc<dyn HttpTransport>>) -> Result<Self> {
        config.upload.validate()?;
        let core = ClientCore::new(&config)?;
        let streaming = ReqwestTransport::from_config(&config.http)?;
        let base: Arc<dyn HttpTransport> = match &custom_transport {
            Some(transport) => Arc::clone(transport),
            None => Arc::new(streaming.clone()),
        };
        let api = RetryTransport::new(Arc::clone(&base), config.retry.factory())
            .with_interceptors(config.interceptors.clone());
        let storage = RetryTransport::new(base, None).with_interceptors(config.interceptors.clone());

        tracing::debug!(target: "hybrid_http::client", base_url = core.base_url(), "client created");
        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                core,
                api,
                storage,
                streaming,
                custom_transport,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        self.inner.core.base_url()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Send an API request.
    ///
    /// Returns decoded JSON for `application/json` responses and the raw
    /// response otherwise. Failure statuses, after retries, are
    /// [`ClientError::Status`].
    pub async fn request(&self, request: ApiRequest) -> Result<Value> {
        let method = request.method.clone();
        let request = self.inner.core.build_request(request)?;
        let url = request.url.clone();
        let response = self.inner.api.send(request).await?;
        self.inner.core.finish(&method, &url, response)
    }

    /// PUT `data` to a presigned storage URL, without credentials or retries.
    pub async fn storage_put(&self, url: &str, data: Bytes) -> Result<HttpResponse> {
        let request = self.inner.core.storage_request(url, data)?;
        self.inner.storage.send(request).await
    }

    /// Upload `source` in chunks. See [`upload_multipart`].
    ///
    /// Chunks are read synchronously between requests. On a multi-thread
    /// runtime the reads run inside [`tokio::task::block_in_place`]; on a
    /// current-thread runtime they block the runtime thread for the length of
    /// one chunk.
    pub async fn upload_fileobj<R>(&self, source: R, filename: &str) -> Result<Value>
    where
        R: Read + Seek + Send,
    {
        let options = self.inner.config.upload.clone();
        let filename = filename.to_string();
        let source = OffloadedReader(source);
        self.run(|co| async move { upload_multipart(&co, source, &filename, &options).await })
            .await
    }

    pub async fn upload_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let filename = file_name(path)?;
        let file = tokio::fs::File::open(path).await?.into_std().await;
        self.upload_fileobj(file, &filename).await
    }

    /// Run a routine with this client as its root.
    pub async fn run<T, F, Fut>(&self, routine: F) -> Result<T>
    where
        F: FnOnce(Co) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        drive(self, routine).await
    }

    /// Stream the body of a GET against the API.
    ///
    /// Failure statuses surface as the stream's first and only item.
    pub fn download_stream(&self, url: &str) -> impl Stream<Item = Result<Bytes>> + Send + 'static + use<> {
        let client = self.clone();
        let url = url.to_string();
        futures::stream::once(async move { client.open_download(&url).await })
            .map_ok(|response| response.bytes_stream().map_err(ClientError::from))
            .try_flatten()
    }

    async fn open_download(&self, url: &str) -> Result<reqwest::Response> {
        let request = self.inner.core.build_request(ApiRequest::get("").url(url))?;
        let response = self.inner.streaming.send_streaming(request).await?;
        if response.status().is_success() {
            return Ok(response);
        }
        let url = response.url().to_string();
        let response = HttpResponse::from_reqwest(response).await?;
        Err(ClientError::status(url, response))
    }

    /// Blocking facade over this client.
    ///
    /// The client is rebuilt without idle pooled connections: every adapter
    /// call runs on its own short-lived runtime.
    pub fn into_sync(self) -> Result<SyncAdapter<Client>> {
        crate::sync_support::ensure_no_runtime()?;
        let mut config = self.inner.config.clone();
        config.http.pool_max_idle_per_host = Some(0);
        let client = Self::build(config, self.inner.custom_transport.clone())?;
        SyncAdapter::new(client)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url())
            .field("api", &self.inner.api)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AsyncRoot for Client {
    async fn invoke(&self, path: &CallPath, args: CallArgs) -> Result<Value> {
        match Route::parse(path, args)? {
            Route::Api(request) => self.request(request).await,
            Route::StoragePut { url, data } => self.storage_put(&url, data).await.map(Value::from),
        }
    }

    async fn read(&self, path: &CallPath) -> Result<Value> {
        self.inner.core.read(path)
    }
}

/// Moves reads and seeks off the async worker when the runtime allows it.
struct OffloadedReader<R>(R);

impl<R> OffloadedReader<R> {
    fn offload<T>(&mut self, f: impl FnOnce(&mut R) -> T) -> T {
        let multi_thread = Handle::try_current()
            .map(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread)
            .unwrap_or(false);
        if multi_thread {
            tokio::task::block_in_place(|| f(&mut self.0))
        } else {
            f(&mut self.0)
        }
    }
}

impl<R: Read> Read for OffloadedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.offload(|inner| inner.read(buf))
    }
}

impl<R: Seek> Seek for OffloadedReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.offload(|inner| inner.seek(pos))
    }
}

pub(crate) fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| ClientError::InvalidArgument(format!("{} has no file name", path.display())))
}
