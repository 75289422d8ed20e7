//! Identifier-safe names for path segments
//!
//! Segments such as `sub01.grp` or `2019` cannot be used for attribute-style
//! navigation. Each group keeps a [`NameTable`] mapping raw segments to
//! sanitized identifiers and back; the mapping must stay a bijection.

use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap};

/// Words that cannot be used as identifiers even though they are well formed
const RESERVED: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "Self", "static", "struct", "super", "trait", "true", "try", "type",
    "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Transform a raw segment into an identifier-like name
///
/// * `.` becomes `_DOT_`
/// * any other character outside `[A-Za-z0-9_]` becomes `_U<hex>_`
/// * a leading digit gets a `NUM_` prefix
/// * reserved words get a trailing `_`
/// * the empty segment becomes `_`
pub fn sanitize(raw: &str) -> String {
    if raw.is_empty() {
        return "_".to_string();
    }

    let mut name = String::with_capacity(raw.len() + 8);
    if raw.starts_with(|c: char| c.is_ascii_digit()) {
        name.push_str("NUM_");
    }

    for c in raw.chars() {
        match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '_' => name.push(c),
            '.' => name.push_str("_DOT_"),
            other => name.push_str(&format!("_U{:X}_", other as u32)),
        }
    }

    if RESERVED.contains(&name.as_str()) {
        name.push('_');
    }

    name
}

/// Whether a raw segment can be used as-is
pub fn is_identifier(raw: &str) -> bool {
    sanitize(raw) == raw
}

/// Bijective raw <-> sanitized mapping for the children of one group
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    by_sanitized: BTreeMap<String, String>,
    by_raw: HashMap<String, String>,
}

impl NameTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raw name and return its sanitized form
    ///
    /// Registering the same raw name twice is a no-op.
    ///
    /// # Errors
    /// `NameCollision` when a different raw name already owns the sanitized
    /// form. The table is left unchanged.
    pub fn insert(&mut self, group: &str, raw: &str) -> Result<String> {
        if let Some(existing) = self.by_raw.get(raw) {
            return Ok(existing.clone());
        }

        let sanitized = sanitize(raw);
        if let Some(owner) = self.by_sanitized.get(&sanitized) {
            return Err(Error::NameCollision {
                group: group.to_string(),
                first: owner.clone(),
                second: raw.to_string(),
                sanitized,
            });
        }

        self.by_sanitized.insert(sanitized.clone(), raw.to_string());
        self.by_raw.insert(raw.to_string(), sanitized.clone());
        Ok(sanitized)
    }

    /// Raw name for a sanitized name
    pub fn raw(&self, sanitized: &str) -> Option<&str> {
        self.by_sanitized.get(sanitized).map(String::as_str)
    }

    /// Sanitized name for a raw name
    pub fn sanitized(&self, raw: &str) -> Option<&str> {
        self.by_raw.get(raw).map(String::as_str)
    }

    /// Resolve either form of a name to the raw segment
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.raw(name)
            .or_else(|| self.by_raw.get_key_value(name).map(|(k, _)| k.as_str()))
    }

    /// Sanitized names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_sanitized.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_raw.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_rules() {
        assert_eq!(sanitize("data"), "data");
        assert_eq!(sanitize("sub01.grp"), "sub01_DOT_grp");
        assert_eq!(sanitize("2019"), "NUM_2019");
        assert_eq!(sanitize("01.h5"), "NUM_01_DOT_h5");
        assert_eq!(sanitize("a-b"), "a_U2D_b");
        assert_eq!(sanitize("type"), "type_");
        assert_eq!(sanitize(""), "_");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("image_data"));
        assert!(!is_identifier("image.data"));
        assert!(!is_identifier("fn"));
    }

    #[test]
    fn test_table_round_trips_names() {
        let mut table = NameTable::new();
        let s = table.insert("proj", "sub01.grp").unwrap();
        assert_eq!(s, "sub01_DOT_grp");
        assert_eq!(table.raw("sub01_DOT_grp"), Some("sub01.grp"));
        assert_eq!(table.sanitized("sub01.grp"), Some("sub01_DOT_grp"));
        assert_eq!(table.lookup("sub01.grp"), Some("sub01.grp"));
        assert_eq!(table.lookup("sub01_DOT_grp"), Some("sub01.grp"));
        assert_eq!(table.lookup("missing"), None);
    }

    #[test]
    fn test_reinsert_is_idempotent() {
        let mut table = NameTable::new();
        table.insert("", "a.b").unwrap();
        table.insert("", "a.b").unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_collision_is_reported() {
        let mut table = NameTable::new();
        table.insert("proj", "a.b").unwrap();
        let err = table.insert("proj", "a_DOT_b").unwrap_err();
        match err {
            Error::NameCollision {
                group,
                first,
                second,
                sanitized,
            } => {
                assert_eq!(group, "proj");
                assert_eq!(first, "a.b");
                assert_eq!(second, "a_DOT_b");
                assert_eq!(sanitized, "a_DOT_b");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(table.len(), 1);
    }
}
