//! Store URLs and the blocking key-space backend

use crate::reader::CloudReader;
use crate::runtime::shared_runtime;
use crate::writer::CloudWriter;
use crate::{CloudConfig, CloudError, Result};
use cumulus_core::backend::{DirectoryListing, KeyBackend, ObjectBackend, ObjectInfo};
use cumulus_core::key::is_directory_marker;
use futures_util::TryStreamExt;
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use object_store::prefix::PrefixStore;
use object_store::{DynObjectStore, ObjectStore, PutPayload};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{debug, trace};
use url::Url;

const SCHEMES: &[&str] = &["s3", "gs", "az", "azblob", "file"];

/// Location of a store: provider, bucket and optional key prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudPath {
    /// The storage scheme (s3, gs, az, azblob, file)
    pub scheme: String,
    /// The bucket or container name; the directory for `file://`
    pub bucket: String,
    /// Key prefix every operation is scoped to, without slashes at either end
    pub prefix: String,
}

impl CloudPath {
    /// Parse a store URL like `s3://bucket/some/prefix` or `file:///data/store`
    pub fn parse(url: &str) -> Result<Self> {
        let parsed =
            Url::parse(url).map_err(|e| CloudError::InvalidPath(format!("Invalid URL '{}': {}", url, e)))?;

        let scheme = parsed.scheme().to_string();
        if !SCHEMES.contains(&scheme.as_str()) {
            return Err(CloudError::InvalidPath(format!(
                "Unsupported scheme: {}. Use s3://, gs://, az:// or file://",
                scheme
            )));
        }

        if scheme == "file" {
            let dir = parsed
                .to_file_path()
                .map_err(|_| CloudError::InvalidPath(format!("Not a local path: {}", url)))?;
            return Ok(CloudPath {
                scheme,
                bucket: dir.to_string_lossy().into_owned(),
                prefix: String::new(),
            });
        }

        let bucket = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| CloudError::InvalidPath(format!("Missing bucket name in '{}'", url)))?
            .to_string();

        let prefix = parsed.path().trim_matches('/').to_string();

        Ok(CloudPath {
            scheme,
            bucket,
            prefix,
        })
    }

    /// Whether this points at a local directory
    pub fn is_local(&self) -> bool {
        self.scheme == "file"
    }
}

impl fmt::Display for CloudPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_local() {
            return write!(f, "file://{}", self.bucket);
        }
        write!(f, "{}://{}", self.scheme, self.bucket)?;
        if !self.prefix.is_empty() {
            write!(f, "/{}", self.prefix)?;
        }
        Ok(())
    }
}

/// An object store plus the runtime used to drive it synchronously
#[derive(Clone)]
pub struct CloudStore {
    store: Arc<DynObjectStore>,
    runtime: Arc<Runtime>,
    location: String,
    config: CloudConfig,
}

impl fmt::Debug for CloudStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudStore")
            .field("location", &self.location)
            .field("config", &self.config)
            .finish()
    }
}

impl CloudStore {
    /// Connect to the store a [`CloudPath`] points at
    ///
    /// Cloud credentials come from the environment (`AWS_*`, `GOOGLE_*`,
    /// `AZURE_*`). A missing local directory is created.
    pub fn open(path: &CloudPath) -> Result<Self> {
        let store = create_object_store(path)?;
        debug!("Opened store {}", path);
        Ok(CloudStore {
            store,
            runtime: shared_runtime()?,
            location: path.to_string(),
            config: CloudConfig::default(),
        })
    }

    /// Parse a URL and connect to it
    pub fn open_url(url: &str) -> Result<Self> {
        Self::open(&CloudPath::parse(url)?)
    }

    /// Wrap an existing object store (useful for testing)
    pub fn from_store(store: Arc<DynObjectStore>) -> Result<Self> {
        Ok(CloudStore {
            location: store.to_string(),
            store,
            runtime: shared_runtime()?,
            config: CloudConfig::default(),
        })
    }

    /// Replace the transfer settings
    pub fn with_config(mut self, config: CloudConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the object store instance
    pub fn store(&self) -> &Arc<DynObjectStore> {
        &self.store
    }

    /// Get the Tokio runtime
    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// Human readable location, for messages
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Transfer settings used by readers and writers
    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    /// Open a seekable reader over one object
    pub fn reader(&self, key: &str) -> Result<CloudReader> {
        CloudReader::new(self, Path::from(key))
    }

    /// Open a buffered writer creating or replacing one object
    pub fn writer(&self, key: &str) -> Result<CloudWriter> {
        Ok(CloudWriter::new(self, Path::from(key)))
    }

    fn run<T, F>(&self, context: &str, future: F) -> cumulus_core::Result<T>
    where
        F: Future<Output = object_store::Result<T>>,
    {
        self.runtime
            .block_on(future)
            .map_err(|e| CloudError::from(e).into_core(context))
    }
}

/// Directory part of a listing prefix, as an object path
///
/// `object_store` matches listing prefixes on whole segments, so anything
/// after the last `/` is filtered by the caller instead.
fn listing_path(prefix: &str) -> Option<Path> {
    let dir = match prefix.rfind('/') {
        Some(idx) => &prefix[..idx],
        None => "",
    };
    if dir.is_empty() {
        None
    } else {
        Some(Path::from(dir))
    }
}

impl KeyBackend for CloudStore {
    /// Keys come back sorted, which is what the cloud providers return
    /// natively; local directories are sorted to match.
    fn list_keys(&self, prefix: &str) -> cumulus_core::Result<Vec<String>> {
        let path = listing_path(prefix);
        trace!("Listing {}/{}", self.location, prefix);

        let mut keys: Vec<String> = self.run(prefix, async {
            self.store
                .list(path.as_ref())
                .map_ok(|meta| meta.location.to_string())
                .try_collect()
                .await
        })?;

        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        debug!("Listed {} keys under '{}'", keys.len(), prefix);
        Ok(keys)
    }

    fn key_exists(&self, key: &str) -> cumulus_core::Result<bool> {
        match self.run(key, self.store.head(&Path::from(key))) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn object_size(&self, key: &str) -> cumulus_core::Result<u64> {
        let meta = self.run(key, self.store.head(&Path::from(key)))?;
        Ok(meta.size as u64)
    }

    fn list_directory(&self, prefix: &str) -> cumulus_core::Result<DirectoryListing> {
        if !prefix.is_empty() && !prefix.ends_with('/') {
            let keys = self.list_keys(prefix)?;
            return Ok(DirectoryListing::from_keys(prefix, keys));
        }

        let path = listing_path(prefix);
        let result = self.run(prefix, self.store.list_with_delimiter(path.as_ref()))?;

        let mut prefixes: Vec<String> = result
            .common_prefixes
            .iter()
            .filter_map(|p| {
                let full = p.to_string();
                let name = full.strip_prefix(prefix)?.trim_end_matches('/');
                (!name.is_empty()).then(|| name.to_string())
            })
            .collect();
        let mut keys: Vec<String> = result
            .objects
            .iter()
            .map(|meta| meta.location.to_string())
            .filter(|k| k.len() > prefix.len() && k.starts_with(prefix))
            .collect();

        prefixes.sort();
        keys.sort();
        Ok(DirectoryListing { prefixes, keys })
    }
}

impl ObjectBackend for CloudStore {
    fn get_object(&self, key: &str) -> cumulus_core::Result<Vec<u8>> {
        let path = Path::from(key);
        let bytes = self.run(key, async { self.store.get(&path).await?.bytes().await })?;
        Ok(bytes.to_vec())
    }

    fn put_object(&self, key: &str, data: Vec<u8>) -> cumulus_core::Result<()> {
        debug!("Uploading {} bytes to {}", data.len(), key);
        self.run(key, self.store.put(&Path::from(key), PutPayload::from(data)))?;
        Ok(())
    }

    fn delete_object(&self, key: &str) -> cumulus_core::Result<()> {
        debug!("Deleting {}", key);
        self.run(key, self.store.delete(&Path::from(key)))
    }

    fn object_info(&self, key: &str) -> cumulus_core::Result<ObjectInfo> {
        let meta = self.run(key, self.store.head(&Path::from(key)))?;
        Ok(ObjectInfo {
            key: key.to_string(),
            size: meta.size as u64,
            last_modified: Some(meta.last_modified),
        })
    }

    /// One recursive listing; sizes come from the listing metadata
    fn list_objects(&self, prefix: &str) -> cumulus_core::Result<Vec<ObjectInfo>> {
        let path = listing_path(prefix);
        let mut objects: Vec<ObjectInfo> = self.run(prefix, async {
            self.store
                .list(path.as_ref())
                .map_ok(|meta| ObjectInfo {
                    key: meta.location.to_string(),
                    size: meta.size as u64,
                    last_modified: Some(meta.last_modified),
                })
                .try_collect()
                .await
        })?;

        objects.retain(|o| o.key.starts_with(prefix) && !is_directory_marker(&o.key));
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    fn copy_object(&self, from: &str, to: &str, overwrite: bool) -> cumulus_core::Result<()> {
        let (src, dst) = (Path::from(from), Path::from(to));
        debug!("Copying {} to {}", from, to);

        if overwrite {
            return self.run(from, self.store.copy(&src, &dst));
        }
        match self.runtime.block_on(self.store.copy_if_not_exists(&src, &dst)) {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotSupported { .. } | object_store::Error::NotImplemented) => {
                trace!("Conditional copy unsupported by {}, checking first", self.location);
                if self.key_exists(to)? {
                    return Err(cumulus_core::Error::AlreadyExists(to.to_string()));
                }
                self.run(from, self.store.copy(&src, &dst))
            }
            Err(e @ object_store::Error::AlreadyExists { .. }) => {
                Err(CloudError::from(e).into_core(to))
            }
            Err(e) => Err(CloudError::from(e).into_core(from)),
        }
    }

    fn rename_object(&self, from: &str, to: &str, overwrite: bool) -> cumulus_core::Result<()> {
        if overwrite {
            debug!("Renaming {} to {}", from, to);
            return self.run(from, self.store.rename(&Path::from(from), &Path::from(to)));
        }
        self.copy_object(from, to, false)?;
        self.delete_object(from)
    }
}

fn scoped<S: ObjectStore>(store: S, prefix: &str) -> Arc<DynObjectStore> {
    if prefix.is_empty() {
        Arc::new(store)
    } else {
        Arc::new(PrefixStore::new(store, Path::from(prefix)))
    }
}

fn create_object_store(path: &CloudPath) -> Result<Arc<DynObjectStore>> {
    match path.scheme.as_str() {
        "s3" => {
            let store = object_store::aws::AmazonS3Builder::from_env()
                .with_bucket_name(&path.bucket)
                .build()?;
            Ok(scoped(store, &path.prefix))
        }
        "gs" => {
            let store = object_store::gcp::GoogleCloudStorageBuilder::from_env()
                .with_bucket_name(&path.bucket)
                .build()?;
            Ok(scoped(store, &path.prefix))
        }
        "az" | "azblob" => {
            let store = object_store::azure::MicrosoftAzureBuilder::from_env()
                .with_container_name(&path.bucket)
                .build()?;
            Ok(scoped(store, &path.prefix))
        }
        "file" => {
            let dir = PathBuf::from(&path.bucket);
            std::fs::create_dir_all(&dir)?;
            let store = LocalFileSystem::new_with_prefix(&dir)?;
            Ok(scoped(store, &path.prefix))
        }
        other => Err(CloudError::InvalidPath(format!("Unsupported scheme: {}", other))),
    }
}
