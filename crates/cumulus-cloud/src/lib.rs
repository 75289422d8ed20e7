//! # cumulus-cloud
//!
//! Object store backends for cumulus. [`CloudStore`] wraps any
//! `object_store` implementation (S3, GCS, Azure, a local directory or an
//! in-memory store) behind the blocking [`KeyBackend`] and [`ObjectBackend`]
//! traits the resolver and the tree consume.
//!
//! ## Architecture
//!
//! - `CloudStore`: key listing, metadata and whole-object access
//! - `CloudReader`: `std::io::Read` + `Seek` over one object, in ranged chunks
//! - `CloudWriter`: `std::io::Write` into one object, multipart above a threshold
//!
//! All of them drive the async `object_store` API from a shared Tokio
//! runtime, so none of them may be used from inside another runtime.
//!
//! [`KeyBackend`]: cumulus_core::KeyBackend
//! [`ObjectBackend`]: cumulus_core::ObjectBackend

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod buffer;
mod error;
mod reader;
mod runtime;
mod store;
mod writer;

pub use error::{CloudError, Result};
pub use reader::CloudReader;
pub use store::{CloudPath, CloudStore};
pub use writer::CloudWriter;

// Re-export commonly used types from object_store
pub use object_store::{path::Path as ObjectPath, ObjectMeta, ObjectStore};

use cumulus_core::config::TransferConfig;

/// Configuration for transfers to and from a store
#[derive(Debug, Clone)]
pub struct CloudConfig {
    /// Size of each ranged read in bytes (default: 8MB)
    pub read_buffer_size: usize,
    /// Size of each uploaded part in bytes (default: 8MB)
    pub write_buffer_size: usize,
    /// Number of chunks to cache for read operations (default: 4)
    pub read_cache_size: usize,
    /// Whether to use multipart upload for large objects (default: true)
    pub use_multipart_upload: bool,
    /// Threshold for multipart upload in bytes (default: 64MB)
    pub multipart_threshold: usize,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 8 * 1024 * 1024,
            write_buffer_size: 8 * 1024 * 1024,
            read_cache_size: 4,
            use_multipart_upload: true,
            multipart_threshold: 64 * 1024 * 1024,
        }
    }
}

impl From<&TransferConfig> for CloudConfig {
    fn from(transfer: &TransferConfig) -> Self {
        Self {
            read_buffer_size: transfer.read_buffer_size as usize,
            write_buffer_size: transfer.write_buffer_size as usize,
            read_cache_size: transfer.read_cache_size,
            use_multipart_upload: true,
            multipart_threshold: transfer.multipart_threshold as usize,
        }
    }
}

/// Whether a string looks like a store URL rather than a local path
pub fn is_store_url(s: &str) -> bool {
    ["s3://", "gs://", "az://", "azblob://", "file://"]
        .iter()
        .any(|scheme| s.starts_with(scheme))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_transfer_settings() {
        let transfer = TransferConfig {
            read_buffer_size: 1024,
            read_cache_size: 2,
            write_buffer_size: 2048,
            multipart_threshold: 4096,
        };
        let config = CloudConfig::from(&transfer);
        assert_eq!(config.read_buffer_size, 1024);
        assert_eq!(config.read_cache_size, 2);
        assert_eq!(config.write_buffer_size, 2048);
        assert_eq!(config.multipart_threshold, 4096);
        assert!(config.use_multipart_upload);
    }

    #[test]
    fn test_is_store_url() {
        assert!(is_store_url("s3://bucket/key"));
        assert!(is_store_url("file:///tmp/x"));
        assert!(!is_store_url("/tmp/x"));
        assert!(!is_store_url("https://example.com"));
    }
}
