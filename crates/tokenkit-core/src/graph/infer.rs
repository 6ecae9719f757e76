/// Advisory token-type inference from value shape.
///
/// Used only when a token neither declares a `$type` nor inherits one from
/// an enclosing group. Inference never overrides a declared type, and a
/// value that matches nothing leaves the effective type empty.
use std::sync::LazyLock;

use regex::Regex;

use crate::dynvalue::DynValue;

// All patterns are compile-time literals; Regex::new never fails on them.
// The fallback chain exists only to satisfy the no-panic lint set.

static COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#[0-9a-fA-F]{6}([0-9a-fA-F]{2})?$")
        .unwrap_or_else(|_| Regex::new(".").unwrap_or_else(|_| unreachable!("regex engine broken")))
});

static DIMENSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?\d+(\.\d+)?(px|rem|em|%)$")
        .unwrap_or_else(|_| Regex::new(".").unwrap_or_else(|_| unreachable!("regex engine broken")))
});

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?\d+(\.\d+)?ms$")
        .unwrap_or_else(|_| Regex::new(".").unwrap_or_else(|_| unreachable!("regex engine broken")))
});

/// Infers a token type from the shape of its value, or `None`.
pub fn infer_type(value: &DynValue) -> Option<&'static str> {
    match value {
        DynValue::String(s) => infer_from_string(s),
        DynValue::Integer(_) | DynValue::UnsignedInteger(_) | DynValue::Float(_) => Some("number"),
        DynValue::Object(map) => {
            let has = |k: &str| map.contains_key(k);
            if has("color") && (has("offsetX") || has("offsetY") || has("blur")) {
                Some("shadow")
            } else if has("color") && has("width") && has("style") {
                Some("border")
            } else if has("fontFamily") && has("fontSize") {
                Some("typography")
            } else {
                None
            }
        }
        DynValue::Null | DynValue::Bool(_) | DynValue::Array(_) => None,
    }
}

fn infer_from_string(s: &str) -> Option<&'static str> {
    if COLOR_RE.is_match(s) {
        Some("color")
    } else if DURATION_RE.is_match(s) {
        Some("duration")
    } else if DIMENSION_RE.is_match(s) {
        Some("dimension")
    } else {
        None
    }
}
