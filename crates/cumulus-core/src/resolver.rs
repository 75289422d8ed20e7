//! Glob resolution against a backend key space
//!
//! Only the literal prefix of a pattern is sent to the backend; the wildcard
//! remainder is matched client-side against the returned keys.

use crate::backend::{KeyBackend, ObjectBackend, ObjectInfo};
use crate::key::{
    clean_key, directory_prefix, has_magic, is_directory_marker, join, remove_trivial_magic,
    split_segments, SEPARATOR,
};
use crate::pattern::GlobPattern;
use crate::Result;
use tracing::{debug, trace, warn};

/// Resolves glob patterns into the concrete keys that exist in a backend
#[derive(Debug, Clone)]
pub struct PathResolver<B> {
    backend: B,
}

impl<B: KeyBackend> PathResolver<B> {
    /// Create a resolver over a backend
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Access the underlying backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Resolve a pattern into matching keys, in backend order
    ///
    /// A pattern without wildcards is answered by a single existence check.
    /// A pattern starting with a wildcard lists the whole bucket.
    ///
    /// # Errors
    /// `InvalidPattern` for malformed bracket classes, `BackendUnavailable`
    /// when the listing itself fails.
    pub fn resolve(&self, pattern: &str) -> Result<Vec<String>> {
        let glob = GlobPattern::new(pattern)?;
        self.resolve_pattern(&glob)
    }

    /// Resolve an already compiled pattern
    pub fn resolve_pattern(&self, glob: &GlobPattern) -> Result<Vec<String>> {
        if glob.is_literal() {
            let key = glob.as_str();
            if key.is_empty() || is_directory_marker(key) {
                return Ok(Vec::new());
            }
            let exists = self.backend.key_exists(key)?;
            debug!(key, exists, "Literal pattern resolved by existence check");
            return Ok(if exists { vec![key.to_string()] } else { Vec::new() });
        }

        let prefix = glob.literal_prefix();
        if prefix.is_empty() {
            warn!(
                "Pattern '{}' starts with a wildcard; listing the whole bucket, this may be slow",
                glob
            );
        }

        let keys = self.backend.list_keys(prefix)?;
        debug!("Listed {} keys under prefix '{}'", keys.len(), prefix);

        let matches: Vec<String> = keys
            .into_iter()
            .filter(|key| {
                let hit = !is_directory_marker(key) && glob.matches(key);
                trace!(key = key.as_str(), hit, "Matching key");
                hit
            })
            .collect();

        debug!("Pattern '{}' matched {} keys", glob, matches.len());
        Ok(matches)
    }

    /// Shell-`ls`-like listing
    ///
    /// Without wildcards this lists the immediate children of the directory,
    /// rendering sub-directories with a trailing `/`; a plain key names
    /// itself. With wildcards every key is cut to the depth of the pattern and
    /// the distinct results matching the pattern are returned.
    pub fn ls(&self, pattern: &str) -> Result<Vec<String>> {
        let cleaned = clean_key(pattern);
        let path = remove_trivial_magic(&cleaned);

        if !has_magic(path) {
            return self.ls_directory(path);
        }

        let glob = GlobPattern::new(path)?;
        let depth = glob.depth();
        let keys = self.backend.list_keys(glob.literal_prefix())?;

        let mut entries: Vec<String> = Vec::new();
        for key in keys.iter().filter(|k| !is_directory_marker(k)) {
            let segments = split_segments(key);
            if segments.len() < depth {
                continue;
            }
            let truncated = segments[..depth].join("/");
            if !glob.matches(&truncated) {
                continue;
            }
            let entry = if segments.len() > depth {
                format!("{}{}", truncated, SEPARATOR)
            } else {
                truncated
            };
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    fn ls_directory(&self, path: &str) -> Result<Vec<String>> {
        let prefix = directory_prefix(path);
        let listing = self.backend.list_directory(&prefix)?;

        let mut entries: Vec<String> = listing
            .prefixes
            .iter()
            .map(|name| format!("{}{}", join(&prefix, name), SEPARATOR))
            .collect();
        entries.extend(listing.keys);

        if entries.is_empty() && !path.is_empty() && !path.ends_with(SEPARATOR) {
            if self.backend.key_exists(path)? {
                entries.push(path.to_string());
            }
        }

        Ok(entries)
    }
}

impl<B: ObjectBackend> PathResolver<B> {
    /// Resolve a pattern and fetch metadata for every match
    pub fn search(&self, pattern: &str) -> Result<Vec<ObjectInfo>> {
        self.resolve(pattern)?
            .iter()
            .map(|key| self.backend.object_info(key))
            .collect()
    }
}
