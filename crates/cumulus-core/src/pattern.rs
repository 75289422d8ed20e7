//! Glob patterns over `/`-delimited keys
//!
//! Matching follows shell-glob rules applied per segment: `*` matches zero or
//! more characters, `?` exactly one, `[...]` one character of the class, and
//! none of them ever matches `/`. A pattern is split into a literal prefix
//! (sent to the backend) and a wildcard remainder (matched client-side).

use crate::key::{clean_key, has_magic, split_segments, SEPARATOR};
use crate::{Error, Result};
use glob::{MatchOptions, Pattern};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled glob pattern
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    prefix: String,
    remainder: Option<Pattern>,
}

impl GlobPattern {
    /// Compile a pattern
    ///
    /// # Errors
    /// Returns `InvalidPattern` when a bracket class is unbalanced or empty.
    pub fn new(pattern: &str) -> Result<Self> {
        let source = collapse_stars(&clean_key(pattern));

        let segments = split_segments(&source);
        let first_magic = segments.iter().position(|s| has_magic(s));

        let Some(index) = first_magic else {
            return Ok(Self {
                prefix: source.clone(),
                source,
                remainder: None,
            });
        };

        let mut prefix = segments[..index].join("/");
        if !prefix.is_empty() {
            prefix.push(SEPARATOR);
        }
        let rest = segments[index..].join("/");

        let remainder = Pattern::new(&rest).map_err(|e| Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.msg.to_string(),
        })?;

        Ok(Self {
            source,
            prefix,
            remainder: Some(remainder),
        })
    }

    /// The normalized pattern text
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the pattern contains no wildcard at all
    pub fn is_literal(&self) -> bool {
        self.remainder.is_none()
    }

    /// The leading run of literal segments, `/`-terminated unless empty
    ///
    /// For a literal pattern this is the whole pattern.
    pub fn literal_prefix(&self) -> &str {
        &self.prefix
    }

    /// Number of path segments in the pattern
    pub fn depth(&self) -> usize {
        split_segments(&self.source).len()
    }

    /// Test a full key against the pattern
    pub fn matches(&self, key: &str) -> bool {
        match &self.remainder {
            None => key == self.source,
            Some(remainder) => match key.strip_prefix(self.prefix.as_str()) {
                Some(rest) => remainder.matches_with(rest, MATCH_OPTIONS),
                None => false,
            },
        }
    }
}

impl std::fmt::Display for GlobPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// `**` has no recursive meaning here; any run of stars is a single `*`
fn collapse_stars(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if c == '*' && out.ends_with('*') {
            continue;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_prefix_split() {
        let p = GlobPattern::new("proj/*/data").unwrap();
        assert_eq!(p.literal_prefix(), "proj/");
        assert!(!p.is_literal());
        assert_eq!(p.depth(), 3);

        let p = GlobPattern::new("*.grp").unwrap();
        assert_eq!(p.literal_prefix(), "");

        let p = GlobPattern::new("/proj/sub01.grp/data").unwrap();
        assert!(p.is_literal());
        assert_eq!(p.literal_prefix(), "proj/sub01.grp/data");
    }

    #[test]
    fn test_wildcards_stop_at_separator() {
        let p = GlobPattern::new("proj/*").unwrap();
        assert!(p.matches("proj/a"));
        assert!(!p.matches("proj/a/b"));

        let p = GlobPattern::new("proj/s?b01.grp/*").unwrap();
        assert!(p.matches("proj/sub01.grp/data"));
        assert!(!p.matches("proj/sub01.grp/x/data"));

        let p = GlobPattern::new("proj?data").unwrap();
        assert!(!p.matches("proj/data"));
    }

    #[test]
    fn test_bracket_classes() {
        let p = GlobPattern::new("proj/sub0[12].grp/data").unwrap();
        assert!(p.matches("proj/sub01.grp/data"));
        assert!(p.matches("proj/sub02.grp/data"));
        assert!(!p.matches("proj/sub03.grp/data"));

        let p = GlobPattern::new("proj/sub0[!1].grp/data").unwrap();
        assert!(!p.matches("proj/sub01.grp/data"));
        assert!(p.matches("proj/sub02.grp/data"));
    }

    #[test]
    fn test_unbalanced_bracket_is_invalid() {
        let err = GlobPattern::new("proj/sub[01/data").unwrap_err();
        match err {
            Error::InvalidPattern { pattern, .. } => assert_eq!(pattern, "proj/sub[01/data"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_double_star_is_not_recursive() {
        let p = GlobPattern::new("proj/**").unwrap();
        assert_eq!(p.as_str(), "proj/*");
        assert!(p.matches("proj/a"));
        assert!(!p.matches("proj/a/b"));
    }

    #[test]
    fn test_prefix_must_match_exactly() {
        let p = GlobPattern::new("proj/*/data").unwrap();
        assert!(!p.matches("project/a/data"));
        assert!(!p.matches("other/proj/a/data"));
    }
}
