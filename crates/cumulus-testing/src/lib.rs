//! Testing utilities and fixtures for cumulus
//!
//! This crate provides in-memory backends with call counters, standard key
//! layouts, tree assertions and temporary local stores for testing
//! cumulus-based applications and libraries.

pub mod assertions;
pub mod fixtures;
pub mod helpers;
pub mod memory;

pub use helpers::TestStore;
pub use memory::{CountingBackend, MemoryBackend};

#[cfg(test)]
mod tests {
    use super::*;
    use cumulus_core::VirtualTree;

    #[test]
    fn test_create_store() {
        let store = TestStore::new().unwrap();
        assert!(store.path().exists());
        assert!(store.url().starts_with("file://"));
    }

    #[test]
    fn test_create_object() {
        let store = TestStore::new().unwrap();
        let path = store.create_object("a/b.grp/data", b"Hello, World!").unwrap();
        assert!(path.exists());
        assert!(store.has_object("a/b.grp/data"));
        assert_eq!(store.read_object("a/b.grp/data").unwrap(), b"Hello, World!");
    }

    #[test]
    fn test_leaf_sets_of_project() {
        let tree = VirtualTree::build("", MemoryBackend::with_keys(fixtures::project_keys())).unwrap();
        let leaves = assertions::collect_leaf_sets(&tree).unwrap();
        assert_eq!(leaves.len(), 4);
        assert!(leaves[""].is_empty());
        assert!(leaves["proj/"].is_empty());
        assert_eq!(leaves["proj/sub01.grp/"].len(), 2);
        assert!(leaves["proj/sub02.grp/"].contains("data"));
    }

    #[test]
    fn test_oracle_glob() {
        let keys = fixtures::project_keys();
        assert_eq!(
            assertions::oracle_glob(&keys, "proj/*/data").unwrap(),
            vec!["proj/sub01.grp/data", "proj/sub02.grp/data"]
        );
        assert!(assertions::oracle_glob(&keys, "proj/*").unwrap().is_empty());
    }
}
