/// Reference-dialect conversion: pointer form ⇄ alias form.
///
/// The document transformers are structural maps: they rewrite `$ref`
/// containers and alias strings and touch nothing else. Alias form cannot
/// express a file prefix, so external pointer references survive
/// `to_alias_dialect` unchanged and produce a warning instead.
///
/// The alias spelling is value-targeted, so emission drops a trailing
/// `/$value` (`#/a/b/$value` → `{a.b}`) and `convert_alias_to_pointer`
/// emits the token-level `#/a/b`, leaving value-vs-token disambiguation to
/// the resolver's lookup rules.
use std::fmt;

use crate::dynvalue::{DynMap, DynValue};
use crate::model::{KEY_REF, TokenDocument};
use crate::path::TokenPath;
use crate::reference::{ParsedReference, is_alias_syntax, parse_reference};

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Why a reference was left unchanged by a dialect conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertWarningKind {
    /// Alias emission was requested but the reference is external.
    ExternalUnsupported,
    /// The `$ref` member is not a string.
    UnknownFormat,
}

impl fmt::Display for ConvertWarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExternalUnsupported => f.write_str("external-unsupported"),
            Self::UnknownFormat => f.write_str("unknown-format"),
        }
    }
}

/// A conversion note attached to a specific node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertWarning {
    /// What kind of reference was skipped.
    pub kind: ConvertWarningKind,
    /// Pointer of the node carrying the reference.
    pub source: String,
    /// Detail, including the reference as written.
    pub message: String,
}

impl fmt::Display for ConvertWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.kind, self.source, self.message)
    }
}

/// The product of a dialect conversion.
#[derive(Debug, Clone)]
pub struct ConvertOutcome {
    /// The rewritten document.
    pub document: TokenDocument,
    /// References that could not be rewritten.
    pub warnings: Vec<ConvertWarning>,
}

// ---------------------------------------------------------------------------
// Single-string helpers
// ---------------------------------------------------------------------------

/// Converts `{a.b}` to `#/a/b`. Returns `None` when `s` is not alias syntax.
pub fn convert_alias_to_pointer(s: &str) -> Option<String> {
    if !is_alias_syntax(s) {
        return None;
    }
    match parse_reference(s) {
        ParsedReference::Alias(dotted) => Some(TokenPath::from_dotted(&dotted).to_pointer()),
        ParsedReference::Internal(_) | ParsedReference::External { .. } => None,
    }
}

/// Converts `#/a/b` (or `#/a/b/$value`) to `{a.b}`. Returns `None` for
/// external references, which the alias form cannot express.
pub fn convert_pointer_to_alias(s: &str) -> Option<String> {
    match parse_reference(s) {
        ParsedReference::Internal(pointer) => {
            let dotted = TokenPath::from_pointer(&pointer).to_dotted();
            Some(format!("{{{dotted}}}"))
        }
        ParsedReference::Alias(dotted) => Some(format!("{{{dotted}}}")),
        ParsedReference::External { .. } => None,
    }
}

// ---------------------------------------------------------------------------
// Document transformers
// ---------------------------------------------------------------------------

/// Rewrites every internal pointer-form `$ref` to its alias string.
///
/// External references stay as `$ref` objects and each one produces an
/// [`ConvertWarningKind::ExternalUnsupported`] warning.
pub fn to_alias_dialect(doc: &TokenDocument) -> ConvertOutcome {
    let mut warnings = Vec::new();
    let root = map_members(&doc.root, "#", &mut warnings, &rewrite_to_alias);
    ConvertOutcome {
        document: TokenDocument::from_root(root),
        warnings,
    }
}

/// Rewrites every alias string to a pointer-form `$ref` container.
pub fn to_pointer_dialect(doc: &TokenDocument) -> ConvertOutcome {
    let mut warnings = Vec::new();
    let root = map_members(&doc.root, "#", &mut warnings, &rewrite_to_pointer);
    ConvertOutcome {
        document: TokenDocument::from_root(root),
        warnings,
    }
}

type RewriteFn = dyn Fn(&DynValue, &str, &mut Vec<ConvertWarning>) -> Option<DynValue>;

/// Structural map over a value tree. `rewrite` gets a chance at every node;
/// when it declines, objects and arrays recurse and leaves pass through.
fn map_value(
    value: &DynValue,
    source: &str,
    warnings: &mut Vec<ConvertWarning>,
    rewrite: &RewriteFn,
) -> DynValue {
    if let Some(replacement) = rewrite(value, source, warnings) {
        return replacement;
    }
    match value {
        DynValue::Object(map) => DynValue::Object(map_members(map, source, warnings, rewrite)),
        DynValue::Array(items) => DynValue::Array(
            items
                .iter()
                .map(|item| map_value(item, source, warnings, rewrite))
                .collect(),
        ),
        DynValue::Null
        | DynValue::Bool(_)
        | DynValue::Integer(_)
        | DynValue::UnsignedInteger(_)
        | DynValue::Float(_)
        | DynValue::String(_) => value.clone(),
    }
}

fn map_members(
    members: &DynMap,
    source: &str,
    warnings: &mut Vec<ConvertWarning>,
    rewrite: &RewriteFn,
) -> DynMap {
    let mut out = DynMap::new();
    for (name, member) in members {
        let child_source = format!("{source}/{name}");
        out.insert(
            name.clone(),
            map_value(member, &child_source, warnings, rewrite),
        );
    }
    out
}

/// Rewrite rule for [`to_alias_dialect`].
fn rewrite_to_alias(
    value: &DynValue,
    source: &str,
    warnings: &mut Vec<ConvertWarning>,
) -> Option<DynValue> {
    let map = value.as_object()?;
    let raw = map.get(KEY_REF)?;
    let Some(raw) = raw.as_str() else {
        warnings.push(ConvertWarning {
            kind: ConvertWarningKind::UnknownFormat,
            source: source.to_owned(),
            message: "$ref is not a string; left unchanged".to_owned(),
        });
        return Some(value.clone());
    };
    let alias = match parse_reference(raw) {
        ParsedReference::Internal(pointer) => {
            let dotted = TokenPath::from_pointer(&pointer).to_dotted();
            format!("{{{dotted}}}")
        }
        ParsedReference::Alias(dotted) => format!("{{{dotted}}}"),
        ParsedReference::External { .. } => {
            warnings.push(ConvertWarning {
                kind: ConvertWarningKind::ExternalUnsupported,
                source: source.to_owned(),
                message: format!("external reference {raw:?} cannot become an alias"),
            });
            return Some(value.clone());
        }
    };

    if map.len() == 1 {
        // A bare reference container collapses to the alias string itself.
        return Some(DynValue::String(alias));
    }
    if map.contains_key(crate::model::KEY_VALUE) {
        // $value and $ref together is malformed; conversion won't guess.
        warnings.push(ConvertWarning {
            kind: ConvertWarningKind::UnknownFormat,
            source: source.to_owned(),
            message: "token has both $value and $ref; left unchanged".to_owned(),
        });
        return Some(value.clone());
    }
    // A token with metadata next to its $ref keeps the metadata and gains
    // the alias as its $value.
    let mut out = DynMap::new();
    for (name, member) in map {
        if name == KEY_REF {
            out.insert(crate::model::KEY_VALUE.to_owned(), DynValue::String(alias.clone()));
        } else {
            out.insert(name.clone(), member.clone());
        }
    }
    Some(DynValue::Object(out))
}

/// Rewrite rule for [`to_pointer_dialect`].
fn rewrite_to_pointer(
    value: &DynValue,
    _source: &str,
    _warnings: &mut Vec<ConvertWarning>,
) -> Option<DynValue> {
    let DynValue::String(s) = value else {
        return None;
    };
    if !is_alias_syntax(s) {
        return None;
    }
    let pointer = convert_alias_to_pointer(s)?;
    let mut container = DynMap::new();
    container.insert(KEY_REF.to_owned(), DynValue::String(pointer));
    Some(DynValue::Object(container))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
