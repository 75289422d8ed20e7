//! Storage backend capabilities consumed by the resolver and the tree
//!
//! Implementations live outside this crate (see `cumulus-cloud`). All calls
//! are blocking; timeouts and retries are the implementation's business.

use crate::key::{is_directory_marker, SEPARATOR};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// The immediate children of a directory prefix
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryListing {
    /// Sub-directory names (one segment each, no trailing `/`), backend order
    pub prefixes: Vec<String>,
    /// Full keys of the objects directly under the prefix, backend order
    pub keys: Vec<String>,
}

impl DirectoryListing {
    /// Partition a recursive listing into immediate children of `prefix`
    ///
    /// Every key must start with `prefix`. Sub-directory names keep the order
    /// in which they were first seen.
    pub fn from_keys<I, S>(prefix: &str, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut listing = DirectoryListing::default();

        for key in keys {
            let key = key.as_ref();
            let Some(rest) = key.strip_prefix(prefix) else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }

            match rest.find(SEPARATOR) {
                Some(idx) => {
                    let name = &rest[..idx];
                    if !listing.prefixes.iter().any(|p| p == name) {
                        listing.prefixes.push(name.to_string());
                    }
                }
                None => listing.keys.push(key.to_string()),
            }
        }

        listing
    }
}

/// Metadata about a stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    /// Object key
    pub key: String,
    /// Size in bytes
    pub size: u64,
    /// Last modification time, when the backend reports one
    pub last_modified: Option<DateTime<Utc>>,
}

/// Read-only key-space access
pub trait KeyBackend {
    /// List every key starting with `prefix`
    ///
    /// `prefix` is either empty or ends with `/`. Implementations must resolve
    /// pagination internally and return the complete listing.
    fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Check whether an object exists under exactly this key
    fn key_exists(&self, key: &str) -> Result<bool>;

    /// Size of the object in bytes
    fn object_size(&self, key: &str) -> Result<u64>;

    /// List the immediate children of `prefix`
    ///
    /// The default partitions one `list_keys` call. Backends that support
    /// delimiter listings should override this.
    fn list_directory(&self, prefix: &str) -> Result<DirectoryListing> {
        let keys = self.list_keys(prefix)?;
        Ok(DirectoryListing::from_keys(
            prefix,
            keys.iter().filter(|k| !is_directory_marker(k)),
        ))
    }
}

/// Object byte access on top of key listing
pub trait ObjectBackend: KeyBackend {
    /// Download an object into memory
    fn get_object(&self, key: &str) -> Result<Vec<u8>>;

    /// Upload an object, replacing any existing one
    fn put_object(&self, key: &str, data: Vec<u8>) -> Result<()>;

    /// Delete an object
    fn delete_object(&self, key: &str) -> Result<()>;

    /// Object metadata
    fn object_info(&self, key: &str) -> Result<ObjectInfo> {
        Ok(ObjectInfo {
            key: key.to_string(),
            size: self.object_size(key)?,
            last_modified: None,
        })
    }

    /// Metadata of every object under `prefix`, directory markers excluded
    ///
    /// The default asks for each object's size separately; stores that
    /// return metadata with their listings should override this.
    fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        self.list_keys(prefix)?
            .iter()
            .filter(|k| !is_directory_marker(k))
            .map(|k| self.object_info(k))
            .collect()
    }

    /// Copy an object to a new key
    ///
    /// # Errors
    /// `AlreadyExists` when `to` is taken and `overwrite` is false.
    fn copy_object(&self, from: &str, to: &str, overwrite: bool) -> Result<()> {
        if !overwrite && self.key_exists(to)? {
            return Err(Error::AlreadyExists(to.to_string()));
        }
        let data = self.get_object(from)?;
        self.put_object(to, data)
    }

    /// Move an object to a new key
    fn rename_object(&self, from: &str, to: &str, overwrite: bool) -> Result<()> {
        self.copy_object(from, to, overwrite)?;
        self.delete_object(from)
    }
}

macro_rules! forward_backend {
    ($($ty:ty),*) => {$(
        impl<B: KeyBackend + ?Sized> KeyBackend for $ty {
            fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
                (**self).list_keys(prefix)
            }

            fn key_exists(&self, key: &str) -> Result<bool> {
                (**self).key_exists(key)
            }

            fn object_size(&self, key: &str) -> Result<u64> {
                (**self).object_size(key)
            }

            fn list_directory(&self, prefix: &str) -> Result<DirectoryListing> {
                (**self).list_directory(prefix)
            }
        }

        impl<B: ObjectBackend + ?Sized> ObjectBackend for $ty {
            fn get_object(&self, key: &str) -> Result<Vec<u8>> {
                (**self).get_object(key)
            }

            fn put_object(&self, key: &str, data: Vec<u8>) -> Result<()> {
                (**self).put_object(key, data)
            }

            fn delete_object(&self, key: &str) -> Result<()> {
                (**self).delete_object(key)
            }

            fn object_info(&self, key: &str) -> Result<ObjectInfo> {
                (**self).object_info(key)
            }

            fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
                (**self).list_objects(prefix)
            }

            fn copy_object(&self, from: &str, to: &str, overwrite: bool) -> Result<()> {
                (**self).copy_object(from, to, overwrite)
            }

            fn rename_object(&self, from: &str, to: &str, overwrite: bool) -> Result<()> {
                (**self).rename_object(from, to, overwrite)
            }
        }
    )*};
}

forward_backend!(&B, Box<B>, Arc<B>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_root() {
        let keys = [
            "proj/sub01.grp/data",
            "proj/sub01.grp/meta",
            "readme",
            "proj/sub02.grp/data",
        ];
        let listing = DirectoryListing::from_keys("", keys);
        assert_eq!(listing.prefixes, vec!["proj"]);
        assert_eq!(listing.keys, vec!["readme"]);
    }

    #[test]
    fn test_partition_nested_keeps_first_seen_order() {
        let keys = [
            "proj/sub02.grp/data",
            "proj/sub01.grp/data",
            "proj/sub02.grp/meta",
            "proj/notes",
        ];
        let listing = DirectoryListing::from_keys("proj/", keys);
        assert_eq!(listing.prefixes, vec!["sub02.grp", "sub01.grp"]);
        assert_eq!(listing.keys, vec!["proj/notes"]);
    }

    #[test]
    fn test_partition_skips_foreign_and_marker_keys() {
        let keys = ["proj/", "other/a", "proj/a"];
        let listing = DirectoryListing::from_keys("proj/", keys);
        assert!(listing.prefixes.is_empty());
        assert_eq!(listing.keys, vec!["proj/a"]);
    }
}
