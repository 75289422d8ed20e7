//! In-memory store whose multipart uploads reject parts after a limit

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    GetOptions, GetResult, ListResult, MultipartUpload, ObjectMeta, ObjectStore, PutMultipartOpts,
    PutOptions, PutPayload, PutResult, UploadPart,
};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct PartLimitedStore {
    inner: InMemory,
    parts_allowed: usize,
    aborted: Arc<AtomicBool>,
}

impl PartLimitedStore {
    pub fn new(parts_allowed: usize) -> Self {
        Self {
            inner: InMemory::new(),
            parts_allowed,
            aborted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether any multipart upload was aborted
    pub fn aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

impl fmt::Display for PartLimitedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PartLimitedStore({})", self.parts_allowed)
    }
}

#[async_trait]
impl ObjectStore for PartLimitedStore {
    async fn put_opts(
        &self,
        location: &Path,
        payload: PutPayload,
        opts: PutOptions,
    ) -> object_store::Result<PutResult> {
        self.inner.put_opts(location, payload, opts).await
    }

    async fn put_multipart_opts(
        &self,
        location: &Path,
        opts: PutMultipartOpts,
    ) -> object_store::Result<Box<dyn MultipartUpload>> {
        let inner = self.inner.put_multipart_opts(location, opts).await?;
        Ok(Box::new(PartLimitedUpload {
            inner,
            remaining: self.parts_allowed,
            aborted: self.aborted.clone(),
        }))
    }

    async fn get_opts(&self, location: &Path, options: GetOptions) -> object_store::Result<GetResult> {
        self.inner.get_opts(location, options).await
    }

    async fn delete(&self, location: &Path) -> object_store::Result<()> {
        self.inner.delete(location).await
    }

    fn list(&self, prefix: Option<&Path>) -> BoxStream<'_, object_store::Result<ObjectMeta>> {
        self.inner.list(prefix)
    }

    async fn list_with_delimiter(&self, prefix: Option<&Path>) -> object_store::Result<ListResult> {
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.inner.copy(from, to).await
    }

    async fn copy_if_not_exists(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.inner.copy_if_not_exists(from, to).await
    }
}

#[derive(Debug)]
struct PartLimitedUpload {
    inner: Box<dyn MultipartUpload>,
    remaining: usize,
    aborted: Arc<AtomicBool>,
}

#[async_trait]
impl MultipartUpload for PartLimitedUpload {
    fn put_part(&mut self, data: PutPayload) -> UploadPart {
        if self.remaining == 0 {
            return Box::pin(futures_util::future::ready(Err(object_store::Error::Generic {
                store: "PartLimitedStore",
                source: "part rejected".into(),
            })));
        }
        self.remaining -= 1;
        self.inner.put_part(data)
    }

    async fn complete(&mut self) -> object_store::Result<PutResult> {
        self.inner.complete().await
    }

    async fn abort(&mut self) -> object_store::Result<()> {
        self.aborted.store(true, Ordering::SeqCst);
        self.inner.abort().await
    }
}
