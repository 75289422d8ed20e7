//! Key and path helpers
//!
//! Keys are `/`-delimited strings. A "directory" is never an object of its
//! own: it is the set of keys sharing a `/`-terminated prefix.

/// Separator between simulated path segments
pub const SEPARATOR: char = '/';

/// Normalize a user-supplied key or pattern
///
/// Repeated separators collapse into one and a single leading separator is
/// dropped, so `"//proj//a"` and `"/proj/a"` both become `"proj/a"`.
pub fn clean_key(key: &str) -> String {
    let mut cleaned = String::with_capacity(key.len());
    let mut previous_was_separator = false;

    for c in key.chars() {
        if c == SEPARATOR {
            if previous_was_separator {
                continue;
            }
            previous_was_separator = true;
        } else {
            previous_was_separator = false;
        }
        cleaned.push(c);
    }

    match cleaned.strip_prefix(SEPARATOR) {
        Some(rest) => rest.to_string(),
        None => cleaned,
    }
}

/// Check whether a string contains any glob metacharacter
pub fn has_magic(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Check whether a pattern only ends in a bare `/*`
///
/// `"data/*"` lists a directory the same way `"data/"` does, so it does not
/// need client-side filtering.
pub fn has_trivial_magic(s: &str) -> bool {
    match s.strip_suffix("/*") {
        Some(head) => !has_magic(head),
        None => s == "*",
    }
}

/// Check whether a pattern needs client-side glob filtering
pub fn has_real_magic(s: &str) -> bool {
    has_magic(s) && !has_trivial_magic(s)
}

/// Turn `"xxx/*"` into `"xxx/"`; anything else is returned unchanged
pub fn remove_trivial_magic(s: &str) -> &str {
    if has_trivial_magic(s) {
        &s[..s.len() - 1]
    } else {
        s
    }
}

/// Make a path usable as a listing prefix
///
/// * `xxx/yyy` -> `xxx/yyy/`
/// * `xxx/`    -> `xxx/`
/// * `/`, `""` -> `""`
pub fn directory_prefix(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return String::new();
    }
    if path.ends_with(SEPARATOR) {
        path.to_string()
    } else {
        format!("{}{}", path, SEPARATOR)
    }
}

/// Split a key into its path segments
pub fn split_segments(key: &str) -> Vec<&str> {
    if key.is_empty() {
        return Vec::new();
    }
    key.split(SEPARATOR).collect()
}

/// Join path segments with the separator
pub fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a directory prefix (possibly empty) and a child name
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else if parent.ends_with(SEPARATOR) {
        format!("{}{}", parent, name)
    } else {
        format!("{}{}{}", parent, SEPARATOR, name)
    }
}

/// Split `"a/b/c"` into `("a/b", "c")`
pub fn parent_and_name(key: &str) -> (&str, &str) {
    let trimmed = key.trim_end_matches(SEPARATOR);
    match trimmed.rfind(SEPARATOR) {
        Some(idx) => (&trimmed[..idx], &trimmed[idx + 1..]),
        None => ("", trimmed),
    }
}

/// Keys ending in `/` are zero-byte directory placeholders created by some tools
pub fn is_directory_marker(key: &str) -> bool {
    key.ends_with(SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_key() {
        assert_eq!(clean_key("/proj/a"), "proj/a");
        assert_eq!(clean_key("//proj//a///b"), "proj/a/b");
        assert_eq!(clean_key("proj/a/"), "proj/a/");
        assert_eq!(clean_key(""), "");
        assert_eq!(clean_key("/"), "");
    }

    #[test]
    fn test_magic_detection() {
        assert!(has_magic("proj/*/data"));
        assert!(has_magic("file?.txt"));
        assert!(has_magic("sub[01].grp"));
        assert!(!has_magic("proj/sub01.grp/data"));

        assert!(has_trivial_magic("proj/*"));
        assert!(!has_trivial_magic("proj/*/data"));
        assert!(!has_trivial_magic("p?oj/*"));
        assert!(has_real_magic("proj/*/data"));
        assert!(!has_real_magic("proj/*"));
        assert!(!has_real_magic("proj/"));
    }

    #[test]
    fn test_remove_trivial_magic() {
        assert_eq!(remove_trivial_magic("xxx/*"), "xxx/");
        assert_eq!(remove_trivial_magic("xxx/"), "xxx/");
        assert_eq!(remove_trivial_magic("xxx/*/yyy/"), "xxx/*/yyy/");
        assert_eq!(remove_trivial_magic("*"), "");
    }

    #[test]
    fn test_directory_prefix() {
        assert_eq!(directory_prefix("xxx/yyy"), "xxx/yyy/");
        assert_eq!(directory_prefix("xxx/"), "xxx/");
        assert_eq!(directory_prefix("/"), "");
        assert_eq!(directory_prefix(""), "");
    }

    #[test]
    fn test_segments() {
        assert_eq!(split_segments("a/b.grp/c"), vec!["a", "b.grp", "c"]);
        assert!(split_segments("").is_empty());
        assert_eq!(join_segments(&["a", "b"]), "a/b");
        assert_eq!(join("", "a"), "a");
        assert_eq!(join("a/", "b"), "a/b");
        assert_eq!(join("a", "b"), "a/b");
        assert_eq!(parent_and_name("a/b/c"), ("a/b", "c"));
        assert_eq!(parent_and_name("a/b/"), ("a", "b"));
        assert_eq!(parent_and_name("top"), ("", "top"));
    }
}
