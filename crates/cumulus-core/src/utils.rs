//! Utility functions for cumulus-core

use crate::backend::ObjectInfo;
use crate::key::SEPARATOR;
use serde::Serialize;
use std::collections::BTreeMap;

const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB", "EB"];

/// Human readable byte count with binary multiples, e.g. `"10.00MB"`
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0.00B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.2}{}", value, UNITS[unit])
}

/// Total size of a set of objects in bytes
pub fn total_size(objects: &[ObjectInfo]) -> u64 {
    objects.iter().map(|o| o.size).sum()
}

/// Space used by one entry of a directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Usage {
    /// Sub-directory prefix (`/`-terminated) or object key
    pub path: String,
    /// Total bytes
    pub size: u64,
    /// Number of objects counted
    pub objects: usize,
}

/// Sum object sizes per immediate child of `prefix`
///
/// Objects in sub-directories are charged to that sub-directory. Objects
/// not under `prefix` are ignored. Entries are sorted by path.
pub fn usage_by_child(prefix: &str, objects: &[ObjectInfo]) -> Vec<Usage> {
    let mut entries: BTreeMap<String, Usage> = BTreeMap::new();

    for object in objects {
        let Some(rest) = object.key.strip_prefix(prefix) else {
            continue;
        };
        let path = match rest.find(SEPARATOR) {
            Some(idx) => format!("{}{}", prefix, &rest[..=idx]),
            None => object.key.clone(),
        };
        let entry = entries.entry(path.clone()).or_insert(Usage {
            path,
            size: 0,
            objects: 0,
        });
        entry.size += object.size;
        entry.objects += 1;
    }

    entries.into_values().collect()
}
