//! Cumulus - virtual hierarchical paths over flat object stores
//!
//! This library turns the flat `bucket + key` namespace of an object store
//! into a browsable, lazily materialized tree of groups and datasets, and
//! resolves glob-style patterns against it with as few listing calls as
//! possible.

pub mod backend;
pub mod config;
pub mod error;
pub mod key;
pub mod naming;
pub mod pattern;
pub mod resolver;
pub mod tree;
pub mod utils;

pub use error::{Error, Result};

// Re-export commonly used types
pub use backend::{DirectoryListing, KeyBackend, ObjectBackend, ObjectInfo};
pub use pattern::GlobPattern;
pub use resolver::PathResolver;
pub use tree::{Dataset, Group, GroupKind, Listing, Node, TreeOptions, VirtualTree};
