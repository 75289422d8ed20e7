//! CloudWriter - provides synchronous Write trait for stored objects

use crate::buffer::WriteBuffer;
use crate::{CloudConfig, CloudError, CloudStore, Result};
use object_store::path::Path;
use object_store::{DynObjectStore, MultipartUpload, PutPayload};
use std::io::Write;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{debug, trace, warn};

/// A writer that uploads everything written to it as one object
///
/// Data is held in memory until it exceeds the multipart threshold; from
/// then on it is uploaded in parts of `write_buffer_size` bytes. Nothing is
/// visible in the store before [`CloudWriter::finalize`] succeeds.
///
/// A writer dropped without `finalize`, or one whose upload failed, discards
/// its data and aborts any multipart upload in progress.
pub struct CloudWriter {
    store: Arc<DynObjectStore>,
    runtime: Arc<Runtime>,
    path: Path,
    buffer: WriteBuffer,
    config: CloudConfig,
    /// Total bytes accepted so far
    bytes_written: u64,
    /// Multipart upload handle (if using multipart)
    multipart: Option<Box<dyn MultipartUpload>>,
    parts_uploaded: usize,
    finished: bool,
    /// An upload request failed; no later call may commit
    failed: bool,
}

impl std::fmt::Debug for CloudWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudWriter")
            .field("path", &self.path)
            .field("bytes_written", &self.bytes_written)
            .field("multipart", &self.multipart.is_some())
            .finish()
    }
}

impl CloudWriter {
    /// Create a writer for `path`, using the store's transfer settings
    pub fn new(store: &CloudStore, path: Path) -> Self {
        let config = store.config().clone();
        Self {
            store: store.store().clone(),
            runtime: store.runtime().clone(),
            path,
            buffer: WriteBuffer::new(config.write_buffer_size),
            config,
            bytes_written: 0,
            multipart: None,
            parts_uploaded: 0,
            finished: false,
            failed: false,
        }
    }

    /// Get the total number of bytes written
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Whether the upload switched to multipart
    pub fn is_multipart(&self) -> bool {
        self.multipart.is_some()
    }

    /// Number of parts uploaded so far
    pub fn parts_uploaded(&self) -> usize {
        self.parts_uploaded
    }

    fn part_size(&self) -> usize {
        self.config.write_buffer_size.max(1)
    }

    /// Start multipart once over the threshold, then ship every full part
    fn upload_full_parts(&mut self) -> Result<()> {
        if self.multipart.is_none() {
            if !self.config.use_multipart_upload
                || self.buffer.len() <= self.config.multipart_threshold
            {
                return Ok(());
            }
            debug!("Starting multipart upload for {}", self.path);
            let upload = self.runtime.block_on(self.store.put_multipart(&self.path))?;
            self.multipart = Some(upload);
        }

        let part_size = self.part_size();
        while self.buffer.len() >= part_size {
            let part = self.buffer.take_part(part_size);
            self.put_part(part.into())?;
        }
        Ok(())
    }

    fn put_part(&mut self, payload: PutPayload) -> Result<()> {
        if let Some(upload) = self.multipart.as_mut() {
            trace!("Uploading part {} of {}", self.parts_uploaded + 1, self.path);
            self.runtime.block_on(upload.put_part(payload))?;
            self.parts_uploaded += 1;
        }
        Ok(())
    }

    /// Drop buffered data and abort the multipart upload, if any
    fn abort(&mut self) {
        self.finished = true;
        self.buffer.take();

        if let Some(mut upload) = self.multipart.take() {
            debug!("Aborting multipart upload of {}", self.path);
            if let Err(e) = self.runtime.block_on(upload.abort()) {
                warn!("Failed to abort upload of {}: {}", self.path, e);
            }
        }
    }

    fn finish(&mut self) -> Result<()> {
        if self.failed {
            self.abort();
            return Err(CloudError::UploadAborted(self.path.to_string()));
        }
        let result = self.commit();
        if result.is_err() {
            self.failed = true;
            self.abort();
        }
        self.finished = true;
        result
    }

    fn commit(&mut self) -> Result<()> {
        if self.multipart.is_some() {
            if !self.buffer.is_empty() {
                let rest = self.buffer.take();
                self.put_part(rest.into())?;
            }
            if let Some(mut upload) = self.multipart.take() {
                debug!(
                    "Completing multipart upload for {} ({} parts)",
                    self.path, self.parts_uploaded
                );
                if let Err(e) = self.runtime.block_on(upload.complete()) {
                    self.multipart = Some(upload);
                    return Err(e.into());
                }
            }
        } else {
            let data = self.buffer.take();
            debug!("Uploading {} bytes to {}", data.len(), self.path);
            self.runtime
                .block_on(self.store.put(&self.path, data.into()))?;
        }

        Ok(())
    }

    /// Upload whatever is still buffered and commit the object
    ///
    /// Fails without committing anything if an earlier write failed.
    pub fn finalize(mut self) -> Result<()> {
        self.finish()
    }
}

impl Write for CloudWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.failed || self.finished {
            return Err(CloudError::UploadAborted(self.path.to_string()).into());
        }
        if buf.is_empty() {
            return Ok(0);
        }

        self.buffer.write(buf);
        self.bytes_written += buf.len() as u64;
        if let Err(e) = self.upload_full_parts() {
            self.failed = true;
            self.abort();
            return Err(e.into());
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        // Objects are immutable once committed; parts go out as they fill up
        Ok(())
    }
}

impl Drop for CloudWriter {
    fn drop(&mut self) {
        if !self.finished {
            if self.bytes_written > 0 || self.multipart.is_some() {
                warn!(
                    "Discarding unfinished upload of {} ({} bytes)",
                    self.path, self.bytes_written
                );
            }
            self.abort();
        }
    }
}
