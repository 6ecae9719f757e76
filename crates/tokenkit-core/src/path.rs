/// Token paths: ordered name segments addressing a node in a document.
///
/// The same path has three spellings: segment list (canonical, in memory),
/// pointer form (`#/a/b`, JSON-pointer-like), and dotted form (`a.b`, as it
/// appears inside `{a.b}` aliases). [`TokenPath`] is the canonical form;
/// the other two are parse/emit surfaces.
///
/// Comparison is segment-wise lexicographic, which is what cycle reporting
/// uses to pick a deterministic chain start.
use std::fmt;

use crate::model::KEY_VALUE;

/// An ordered sequence of name segments addressing a node from the root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TokenPath {
    segments: Vec<String>,
}

impl TokenPath {
    /// Creates a path from owned segments.
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Creates an empty (root) path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a pointer string (`#/a/b` or `/a/b`), keeping a trailing
    /// `$value` segment.
    ///
    /// Empty segments produced by doubled separators are dropped, so
    /// `#//a` and `#/a` are the same path. A bare `#` is the root path.
    pub fn from_pointer(pointer: &str) -> Self {
        let body = pointer.strip_prefix('#').unwrap_or(pointer);
        let segments = body
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        Self { segments }
    }

    /// Parses a pointer string for token-level lookup: a trailing `$value`
    /// segment is dropped so the path addresses the token object itself.
    pub fn from_pointer_token_level(pointer: &str) -> Self {
        let mut path = Self::from_pointer(pointer);
        if path.segments.last().map(String::as_str) == Some(KEY_VALUE) {
            path.segments.pop();
        }
        path
    }

    /// Parses a dotted string (`a.b.c`), the body of an alias.
    pub fn from_dotted(dotted: &str) -> Self {
        let segments = dotted
            .split('.')
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        Self { segments }
    }

    /// Emits the pointer form: `#/a/b`. The root path is `#`.
    pub fn to_pointer(&self) -> String {
        if self.segments.is_empty() {
            return "#".to_owned();
        }
        let mut out = String::from("#");
        for seg in &self.segments {
            out.push('/');
            out.push_str(seg);
        }
        out
    }

    /// Emits the dotted form: `a.b`. A trailing `$value` segment is dropped
    /// because the alias spelling is always value-targeted.
    pub fn to_dotted(&self) -> String {
        let effective: &[String] =
            if self.segments.last().map(String::as_str) == Some(KEY_VALUE) {
                &self.segments[..self.segments.len() - 1]
            } else {
                &self.segments
            };
        effective.join(".")
    }

    /// The path's segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` if this is the root path.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns a new path with `segment` appended.
    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_owned());
        Self { segments }
    }

    /// Returns `true` if `prefix` is a leading subsequence of this path.
    ///
    /// Every path starts with the root path.
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    /// Returns `true` if the final segment is `$value`.
    pub fn targets_value(&self) -> bool {
        self.segments.last().map(String::as_str) == Some(KEY_VALUE)
    }
}

impl fmt::Display for TokenPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl serde::Serialize for TokenPath {
    /// Paths serialize as their pointer form (`#/a/b`), the spelling used
    /// in machine-readable graph output.
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_pointer())
    }
}

impl From<&[&str]> for TokenPath {
    fn from(segments: &[&str]) -> Self {
        Self {
            segments: segments.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn pointer_parse_basic() {
        let p = TokenPath::from_pointer("#/color/primary");
        assert_eq!(p.segments(), ["color", "primary"]);
    }

    #[test]
    fn pointer_parse_keeps_trailing_value() {
        let p = TokenPath::from_pointer("#/color/primary/$value");
        assert_eq!(p.segments(), ["color", "primary", "$value"]);
        assert!(p.targets_value());
    }

    #[test]
    fn pointer_parse_token_level_drops_trailing_value() {
        let p = TokenPath::from_pointer_token_level("#/color/primary/$value");
        assert_eq!(p.segments(), ["color", "primary"]);
        assert!(!p.targets_value());
    }

    #[test]
    fn pointer_parse_root() {
        assert!(TokenPath::from_pointer("#").is_empty());
        assert!(TokenPath::from_pointer("#/").is_empty());
    }

    #[test]
    fn pointer_parse_without_hash_prefix() {
        let p = TokenPath::from_pointer("/a/b");
        assert_eq!(p.segments(), ["a", "b"]);
    }

    #[test]
    fn pointer_parse_collapses_doubled_separators() {
        let p = TokenPath::from_pointer("#//a///b");
        assert_eq!(p.segments(), ["a", "b"]);
    }

    #[test]
    fn pointer_emit() {
        let p = TokenPath::from(&["a", "b"][..]);
        assert_eq!(p.to_pointer(), "#/a/b");
        assert_eq!(TokenPath::root().to_pointer(), "#");
    }

    #[test]
    fn pointer_round_trip() {
        for s in ["#/a", "#/a/b/c", "#/a/$value"] {
            let p = TokenPath::from_pointer(s);
            assert_eq!(p.to_pointer(), *s);
        }
    }

    #[test]
    fn dotted_parse_and_emit() {
        let p = TokenPath::from_dotted("a.b.c");
        assert_eq!(p.segments(), ["a", "b", "c"]);
        assert_eq!(p.to_dotted(), "a.b.c");
    }

    #[test]
    fn dotted_emit_drops_trailing_value() {
        let p = TokenPath::from_pointer("#/a/b/$value");
        assert_eq!(p.to_dotted(), "a.b");
    }

    #[test]
    fn starts_with_prefix() {
        let p = TokenPath::from(&["a", "b", "c"][..]);
        assert!(p.starts_with(&TokenPath::from(&["a"][..])));
        assert!(p.starts_with(&TokenPath::from(&["a", "b"][..])));
        assert!(p.starts_with(&TokenPath::root()));
        assert!(!p.starts_with(&TokenPath::from(&["b"][..])));
        assert!(!TokenPath::from(&["a"][..]).starts_with(&p));
    }

    #[test]
    fn ordering_is_segment_wise() {
        let a = TokenPath::from(&["a", "b"][..]);
        let ab = TokenPath::from(&["a", "b", "c"][..]);
        let b = TokenPath::from(&["b"][..]);
        assert!(a < ab);
        assert!(ab < b);
    }

    #[test]
    fn child_appends() {
        let p = TokenPath::from(&["a"][..]).child("b");
        assert_eq!(p.segments(), ["a", "b"]);
    }

    #[test]
    fn display_is_dotted() {
        let p = TokenPath::from(&["color", "primary"][..]);
        assert_eq!(p.to_string(), "color.primary");
    }
}
