//! In-memory backends for exercising the resolver and the tree

use cumulus_core::backend::{DirectoryListing, KeyBackend, ObjectBackend};
use cumulus_core::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

/// Objects kept in insertion order
///
/// Listings return keys in the order they were inserted, which lets tests
/// check that callers preserve backend order instead of re-sorting.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: RwLock<Vec<(String, Vec<u8>)>>,
    unavailable: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend holding empty objects under the given keys, in that order
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let backend = Self::new();
        for key in keys {
            backend.insert(key, Vec::new());
        }
        backend
    }

    /// Same as [`MemoryBackend::with_keys`] but listing in lexicographic order
    pub fn sorted<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        keys.sort();
        Self::with_keys(keys)
    }

    /// Insert or replace an object
    pub fn insert(&self, key: impl Into<String>, data: Vec<u8>) {
        let key = key.into();
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        match objects.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = data,
            None => objects.push((key, data)),
        }
    }

    /// Every key, in listing order
    pub fn keys(&self) -> Vec<String> {
        self.read().iter().map(|(k, _)| k.clone()).collect()
    }

    /// Make every subsequent call fail with `BackendUnavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<(String, Vec<u8>)>> {
        self.objects.read().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self, context: &str) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::backend(context, "memory backend switched off"));
        }
        Ok(())
    }
}

impl KeyBackend for MemoryBackend {
    fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        self.check(prefix)?;
        Ok(self
            .read()
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn key_exists(&self, key: &str) -> Result<bool> {
        self.check(key)?;
        Ok(self.read().iter().any(|(k, _)| k == key))
    }

    fn object_size(&self, key: &str) -> Result<u64> {
        self.check(key)?;
        self.read()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, data)| data.len() as u64)
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }
}

impl ObjectBackend for MemoryBackend {
    fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        self.check(key)?;
        self.read()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    fn put_object(&self, key: &str, data: Vec<u8>) -> Result<()> {
        self.check(key)?;
        self.insert(key, data);
        Ok(())
    }

    fn delete_object(&self, key: &str) -> Result<()> {
        self.check(key)?;
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        let before = objects.len();
        objects.retain(|(k, _)| k != key);
        if objects.len() == before {
            return Err(Error::NotFound(key.to_string()));
        }
        Ok(())
    }
}

/// Wraps a backend and counts the calls made through it
#[derive(Debug, Default)]
pub struct CountingBackend<B> {
    inner: B,
    list_calls: AtomicUsize,
    exists_calls: AtomicUsize,
    size_calls: AtomicUsize,
}

impl<B> CountingBackend<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            list_calls: AtomicUsize::new(0),
            exists_calls: AtomicUsize::new(0),
            size_calls: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Listing calls of either kind (recursive or directory)
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub fn size_calls(&self) -> usize {
        self.size_calls.load(Ordering::SeqCst)
    }
}

impl<B: KeyBackend> KeyBackend for CountingBackend<B> {
    fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_keys(prefix)
    }

    fn key_exists(&self, key: &str) -> Result<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.key_exists(key)
    }

    fn object_size(&self, key: &str) -> Result<u64> {
        self.size_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.object_size(key)
    }

    fn list_directory(&self, prefix: &str) -> Result<DirectoryListing> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_directory(prefix)
    }
}

impl<B: ObjectBackend> ObjectBackend for CountingBackend<B> {
    fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        self.inner.get_object(key)
    }

    fn put_object(&self, key: &str, data: Vec<u8>) -> Result<()> {
        self.inner.put_object(key, data)
    }

    fn delete_object(&self, key: &str) -> Result<()> {
        self.inner.delete_object(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_keeps_insertion_order() {
        let backend = MemoryBackend::with_keys(["b/1", "a/1", "b/2"]);
        assert_eq!(backend.list_keys("b/").unwrap(), vec!["b/1", "b/2"]);
        assert_eq!(backend.list_keys("").unwrap(), vec!["b/1", "a/1", "b/2"]);
    }

    #[test]
    fn test_unavailable_switch() {
        let backend = MemoryBackend::with_keys(["a"]);
        backend.set_unavailable(true);
        assert!(matches!(
            backend.list_keys(""),
            Err(Error::BackendUnavailable { .. })
        ));
        backend.set_unavailable(false);
        assert!(backend.key_exists("a").unwrap());
    }

    #[test]
    fn test_counting_wrapper() {
        let backend = CountingBackend::new(MemoryBackend::with_keys(["a/b"]));
        backend.list_directory("").unwrap();
        backend.list_keys("a/").unwrap();
        backend.key_exists("a/b").unwrap();
        assert_eq!(backend.list_calls(), 2);
        assert_eq!(backend.exists_calls(), 1);
        assert_eq!(backend.size_calls(), 0);
    }

    #[test]
    fn test_object_round_trip() {
        let backend = MemoryBackend::new();
        backend.put_object("x/y", b"payload".to_vec()).unwrap();
        assert_eq!(backend.get_object("x/y").unwrap(), b"payload");
        assert_eq!(backend.object_size("x/y").unwrap(), 7);
        backend.delete_object("x/y").unwrap();
        assert!(backend.get_object("x/y").unwrap_err().is_not_found());
    }

    #[test]
    fn test_default_copy_and_rename() {
        let backend = MemoryBackend::new();
        backend.insert("a", b"one".to_vec());
        backend.insert("b", b"two".to_vec());

        let err = backend.copy_object("a", "b", false).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(ref k) if k == "b"));
        assert_eq!(backend.get_object("b").unwrap(), b"two");

        backend.copy_object("a", "b", true).unwrap();
        assert_eq!(backend.get_object("b").unwrap(), b"one");

        backend.rename_object("b", "dir/c", false).unwrap();
        assert!(!backend.key_exists("b").unwrap());
        assert_eq!(backend.get_object("dir/c").unwrap(), b"one");

        let objects = backend.list_objects("dir/").unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].key, "dir/c");
        assert_eq!(objects[0].size, 3);
    }
}
