/// Reference language: classification of the two reference syntaxes.
///
/// A reference names another token (or its value) in one of two spellings:
///
/// - Pointer form — `#/a/b` or `#/a/b/$value`, optionally prefixed with a
///   relative file path for cross-file references (`./other.json#/a/b`).
/// - Alias form — `{a.b}`, always value-targeted.
///
/// Classification is purely syntactic (the kind of a reference never depends
/// on what it resolves to). Tie-break order: alias braces, then a leading
/// `#`, then a file-like prefix before a `#`, then lenient fallback.
use std::fmt;

use crate::path::TokenPath;

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// The syntactic kind of a reference, as recorded on graph edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// Pointer form targeting the same document.
    Internal,
    /// Pointer form prefixed with a relative file path.
    External,
    /// `{dotted.path}` alias form.
    Alias,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal => f.write_str("internal"),
            Self::External => f.write_str("external"),
            Self::Alias => f.write_str("alias"),
        }
    }
}

impl serde::Serialize for RefKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// ParsedReference
// ---------------------------------------------------------------------------

/// The result of parsing a reference string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedReference {
    /// A same-document pointer (`#/a/b`). The stored string always carries
    /// the leading `#`.
    Internal(String),
    /// A cross-file reference. `pointer` is `None` when the reference names
    /// the whole target document (no fragment).
    External {
        /// Relative file path, as written.
        file: String,
        /// Fragment pointer within the target document, with leading `#`.
        pointer: Option<String>,
    },
    /// An alias (`{a.b}`); the stored string is the dotted body.
    Alias(String),
}

impl ParsedReference {
    /// The syntactic kind of this reference.
    pub fn kind(&self) -> RefKind {
        match self {
            Self::Internal(_) => RefKind::Internal,
            Self::External { .. } => RefKind::External,
            Self::Alias(_) => RefKind::Alias,
        }
    }

    /// The target path within its document, when one is named.
    ///
    /// Alias targets are value-level by definition, but the returned path is
    /// the token path (no `$value` segment); callers that need value-level
    /// lookup append it. External whole-document references return `None`.
    pub fn target_path(&self) -> Option<TokenPath> {
        match self {
            Self::Internal(pointer) => Some(TokenPath::from_pointer(pointer)),
            Self::External {
                pointer: Some(p), ..
            } => Some(TokenPath::from_pointer(p)),
            Self::External { pointer: None, .. } => None,
            Self::Alias(dotted) => Some(TokenPath::from_dotted(dotted)),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Returns `true` if `prefix` looks like a relative file path: `./`, `../`,
/// or any `/`-separated segment containing a dot (`tokens/core.json`).
fn is_file_like(prefix: &str) -> bool {
    if prefix.starts_with("./") || prefix.starts_with("../") {
        return true;
    }
    prefix.split('/').any(|seg| seg.contains('.'))
}

/// Classifies a reference string into one of the three syntactic forms.
///
/// Lenient by design: a bare word with no `#`, no braces, and no file-like
/// shape is treated as an internal pointer body, so `"color/primary"` and
/// `"#/color/primary"` parse the same. Malformed alias braces (`{a.b` with
/// no closing brace) fall through to the lenient internal case.
pub fn parse_reference(raw: &str) -> ParsedReference {
    let s = raw.trim();

    if let Some(body) = s.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
        return ParsedReference::Alias(body.trim().to_owned());
    }

    if s.starts_with('#') {
        return ParsedReference::Internal(s.to_owned());
    }

    if let Some(hash_pos) = s.find('#') {
        let (file, fragment) = s.split_at(hash_pos);
        if is_file_like(file) {
            let pointer = if fragment == "#" {
                None
            } else {
                Some(fragment.to_owned())
            };
            return ParsedReference::External {
                file: file.to_owned(),
                pointer,
            };
        }
        // Non-file-like prefix before '#': treat the whole string as an
        // internal pointer body (lenient).
        return ParsedReference::Internal(format!("#{}", s.replace('#', "/")));
    }

    if is_file_like(s) {
        // No fragment: the whole target document.
        return ParsedReference::External {
            file: s.to_owned(),
            pointer: None,
        };
    }

    ParsedReference::Internal(format!("#/{s}"))
}

/// Returns `true` if `raw` is spelled as an alias (`{…}`).
pub fn is_alias_syntax(raw: &str) -> bool {
    let s = raw.trim();
    s.starts_with('{') && s.ends_with('}') && s.len() >= 2
}
