/// Structural merge of two token documents.
///
/// Merging is name-keyed and recursive: corresponding nodes are paired by
/// member name and combined according to their structural classification
/// (token/group, see [`crate::model::classify`]). The right document is the
/// overriding layer by default.
///
/// Conflicts (type mismatch, token-vs-group collisions) are *recorded*, not
/// thrown, in safe mode: resolution proceeds with the preferred side and the
/// caller decides how loud to be. `safe = false` aborts on the first
/// conflict instead, carrying the tree path.
///
/// `$value` merging is type-aware: composite types (shadow, typography,
/// border, transition, gradient, strokeStyle) deep-merge object values field
/// by field so a layer can override a single sub-property; all other types
/// replace wholesale.
use std::collections::BTreeSet;
use std::fmt;

use crate::dynvalue::{DynMap, DynValue};
use crate::model::{
    KEY_EXTENSIONS, KEY_TYPE, KEY_VALUE, NodeKind, TokenDocument, classify, declared_type,
};
use crate::path::TokenPath;

/// The default set of composite token types whose `$value` objects are
/// merged field by field.
pub const COMPOSITE_TYPES: [&str; 6] = [
    "shadow",
    "typography",
    "border",
    "transition",
    "gradient",
    "strokeStyle",
];

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for a merge pass.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// When nodes collide irreconcilably, the right side wins. Default: true.
    pub prefer_right: bool,
    /// Record conflicts and keep going (true, default), or abort on the
    /// first conflict (false).
    pub safe: bool,
    /// Path prefixes to merge; empty means everything. Nodes outside every
    /// include prefix are copied from the left side unchanged.
    pub include: Vec<TokenPath>,
    /// Path prefixes to skip; matching nodes are copied from the left side
    /// unchanged.
    pub exclude: Vec<TokenPath>,
    /// When set, right-side tokens whose effective type is not in the set
    /// are ignored.
    pub types: Option<BTreeSet<String>>,
    /// Token types whose `$value` objects deep-merge. Defaults to
    /// [`COMPOSITE_TYPES`].
    pub composite_types: BTreeSet<String>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            prefer_right: true,
            safe: true,
            include: Vec::new(),
            exclude: Vec::new(),
            types: None,
            composite_types: COMPOSITE_TYPES.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Conflicts
// ---------------------------------------------------------------------------

/// The category of a merge conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Both sides are tokens with different declared types.
    TypeMismatch,
    /// Left is a token, right is a group, at the same name.
    TokenVsGroup,
    /// Left is a group, right is a token, at the same name.
    GroupVsToken,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch => f.write_str("type-mismatch"),
            Self::TokenVsGroup => f.write_str("token-vs-group"),
            Self::GroupVsToken => f.write_str("group-vs-token"),
        }
    }
}

/// A single recorded merge conflict, carrying the tree path and both sides.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeConflict {
    /// What kind of collision occurred.
    pub kind: ConflictKind,
    /// The tree path of the colliding node.
    pub path: TokenPath,
    /// The left-side node at that path.
    pub left: DynValue,
    /// The right-side node at that path.
    pub right: DynValue,
}

impl fmt::Display for MergeConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.kind, self.path)
    }
}

/// Error returned when `safe = false` and a conflict occurs.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeError {
    /// The first conflict encountered.
    pub conflict: MergeConflict,
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "merge conflict: {}", self.conflict)
    }
}

impl std::error::Error for MergeError {}

/// The result of a successful merge pass.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// The combined document.
    pub document: TokenDocument,
    /// All conflicts recorded along the way (empty unless both sides
    /// genuinely collided).
    pub conflicts: Vec<MergeConflict>,
}

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Merges `right` over `left`.
///
/// # Errors
///
/// Returns [`MergeError`] only when `opts.safe` is false and a conflict is
/// found; in safe mode conflicts are recorded in the outcome instead.
pub fn merge(
    left: &TokenDocument,
    right: &TokenDocument,
    opts: &MergeOptions,
) -> Result<MergeOutcome, MergeError> {
    let mut conflicts = Vec::new();
    let root = merge_maps(
        &left.root,
        &right.root,
        &TokenPath::root(),
        None,
        None,
        opts,
        &mut conflicts,
    )?;
    Ok(MergeOutcome {
        document: TokenDocument::from_root(root),
        conflicts,
    })
}

/// Left-associative fold over a document sequence; the result is fully
/// determined by the input order. Conflicts from every step are accumulated.
///
/// An empty sequence yields an empty document.
///
/// # Errors
///
/// See [`merge`].
pub fn merge_all<'a, I>(documents: I, opts: &MergeOptions) -> Result<MergeOutcome, MergeError>
where
    I: IntoIterator<Item = &'a TokenDocument>,
{
    let mut acc = TokenDocument::new();
    let mut conflicts = Vec::new();
    for doc in documents {
        let step = merge(&acc, doc, opts)?;
        acc = step.document;
        conflicts.extend(step.conflicts);
    }
    Ok(MergeOutcome {
        document: acc,
        conflicts,
    })
}

// ---------------------------------------------------------------------------
// Path filters
// ---------------------------------------------------------------------------

/// Returns `true` when the merge should descend into `path`.
///
/// Include prefixes admit a node when the node is inside a prefix *or* is an
/// ancestor of one (so the walk can reach included subtrees). Exclude
/// prefixes cut whole subtrees.
fn path_allowed(path: &TokenPath, opts: &MergeOptions) -> bool {
    if opts.exclude.iter().any(|p| path.starts_with(p)) {
        return false;
    }
    if opts.include.is_empty() {
        return true;
    }
    opts.include
        .iter()
        .any(|p| path.starts_with(p) || p.starts_with(path))
}

// ---------------------------------------------------------------------------
// Recursive merge
// ---------------------------------------------------------------------------

/// Records `conflict`, or aborts when not in safe mode.
fn report(
    conflict: MergeConflict,
    opts: &MergeOptions,
    conflicts: &mut Vec<MergeConflict>,
) -> Result<(), MergeError> {
    if opts.safe {
        conflicts.push(conflict);
        Ok(())
    } else {
        Err(MergeError { conflict })
    }
}

/// Merges two group bodies over the union of their keys.
///
/// Output member order: left members in their original order, then right
/// members that did not exist on the left, in the right's order. This keeps
/// re-merges of unchanged inputs byte-stable.
#[allow(clippy::too_many_arguments)]
fn merge_maps(
    left: &DynMap,
    right: &DynMap,
    path: &TokenPath,
    left_inherited: Option<&str>,
    right_inherited: Option<&str>,
    opts: &MergeOptions,
    conflicts: &mut Vec<MergeConflict>,
) -> Result<DynMap, MergeError> {
    // Group-level $type compatibility (same rule as tokens).
    let left_type = left.get(KEY_TYPE).and_then(DynValue::as_str);
    let right_type = right.get(KEY_TYPE).and_then(DynValue::as_str);
    if let (Some(lt), Some(rt)) = (left_type, right_type) {
        if lt != rt {
            report(
                MergeConflict {
                    kind: ConflictKind::TypeMismatch,
                    path: path.clone(),
                    left: DynValue::String(lt.to_owned()),
                    right: DynValue::String(rt.to_owned()),
                },
                opts,
                conflicts,
            )?;
        }
    }

    // Types inherited by children of this group.
    let child_left_inherited = left_type.or(left_inherited);
    let child_right_inherited = right_type.or(right_inherited);

    let mut out = DynMap::new();

    for (name, left_node) in left {
        let child_path = path.child(name);
        match right.get(name) {
            None => {
                out.insert(name.clone(), left_node.clone());
            }
            Some(right_node) => {
                if crate::model::is_metadata_key(name) {
                    // Metadata members: right wins ($type compatibility was
                    // already checked above).
                    out.insert(name.clone(), right_node.clone());
                    continue;
                }
                if !path_allowed(&child_path, opts) {
                    out.insert(name.clone(), left_node.clone());
                    continue;
                }
                let merged = merge_nodes(
                    left_node,
                    right_node,
                    &child_path,
                    child_left_inherited,
                    child_right_inherited,
                    opts,
                    conflicts,
                )?;
                out.insert(name.clone(), merged);
            }
        }
    }

    for (name, right_node) in right {
        if out.contains_key(name) || left.contains_key(name) {
            continue;
        }
        let child_path = path.child(name);
        if !crate::model::is_metadata_key(name) {
            if !path_allowed(&child_path, opts) {
                // Absent on the left and filtered out: the node is dropped.
                continue;
            }
            if right_token_filtered(right_node, child_right_inherited, opts) {
                continue;
            }
        }
        out.insert(name.clone(), right_node.clone());
    }

    Ok(out)
}

/// Returns `true` when the `types` filter rejects a right-side token.
fn right_token_filtered(
    node: &DynValue,
    inherited: Option<&str>,
    opts: &MergeOptions,
) -> bool {
    let Some(filter) = &opts.types else {
        return false;
    };
    if classify(node) != NodeKind::Token {
        return false;
    }
    match crate::model::effective_type(node, inherited) {
        Some(t) => !filter.contains(t),
        None => true,
    }
}

/// Merges a pair of same-named nodes according to their classification.
#[allow(clippy::too_many_arguments)]
fn merge_nodes(
    left: &DynValue,
    right: &DynValue,
    path: &TokenPath,
    left_inherited: Option<&str>,
    right_inherited: Option<&str>,
    opts: &MergeOptions,
    conflicts: &mut Vec<MergeConflict>,
) -> Result<DynValue, MergeError> {
    match (classify(left), classify(right)) {
        (NodeKind::Token, NodeKind::Token) => merge_tokens(
            left,
            right,
            path,
            left_inherited,
            right_inherited,
            opts,
            conflicts,
        ),
        (NodeKind::Group, NodeKind::Group) => {
            let (Some(lm), Some(rm)) = (left.as_object(), right.as_object()) else {
                return Ok(pick(left, right, opts));
            };
            let merged = merge_maps(
                lm,
                rm,
                path,
                left_inherited,
                right_inherited,
                opts,
                conflicts,
            )?;
            Ok(DynValue::Object(merged))
        }
        (NodeKind::Token, NodeKind::Group) => {
            report(
                MergeConflict {
                    kind: ConflictKind::TokenVsGroup,
                    path: path.clone(),
                    left: left.clone(),
                    right: right.clone(),
                },
                opts,
                conflicts,
            )?;
            Ok(pick(left, right, opts))
        }
        (NodeKind::Group, NodeKind::Token) => {
            report(
                MergeConflict {
                    kind: ConflictKind::GroupVsToken,
                    path: path.clone(),
                    left: left.clone(),
                    right: right.clone(),
                },
                opts,
                conflicts,
            )?;
            Ok(pick(left, right, opts))
        }
        // Unclassifiable shapes (scalars, arrays, metadata-only objects):
        // plain replacement, no conflict.
        (NodeKind::Other, _) | (_, NodeKind::Other) => Ok(pick(left, right, opts)),
    }
}

fn pick(left: &DynValue, right: &DynValue, opts: &MergeOptions) -> DynValue {
    if opts.prefer_right {
        right.clone()
    } else {
        left.clone()
    }
}

/// Merges two tokens: type compatibility check, property-wise right-wins,
/// deep-merged `$extensions`, and type-aware `$value` combination.
#[allow(clippy::too_many_arguments)]
fn merge_tokens(
    left: &DynValue,
    right: &DynValue,
    path: &TokenPath,
    left_inherited: Option<&str>,
    right_inherited: Option<&str>,
    opts: &MergeOptions,
    conflicts: &mut Vec<MergeConflict>,
) -> Result<DynValue, MergeError> {
    if right_token_filtered(right, right_inherited, opts) {
        return Ok(left.clone());
    }

    let left_declared = declared_type(left);
    let right_declared = declared_type(right);
    if let (Some(lt), Some(rt)) = (left_declared, right_declared) {
        if lt != rt {
            report(
                MergeConflict {
                    kind: ConflictKind::TypeMismatch,
                    path: path.clone(),
                    left: left.clone(),
                    right: right.clone(),
                },
                opts,
                conflicts,
            )?;
            return Ok(pick(left, right, opts));
        }
    }

    let (Some(lm), Some(rm)) = (left.as_object(), right.as_object()) else {
        return Ok(pick(left, right, opts));
    };

    let mut out = lm.clone();

    for (name, right_member) in rm {
        match name.as_str() {
            KEY_VALUE => {
                let merged = match lm.get(KEY_VALUE) {
                    Some(left_value) => {
                        let effective = right_declared
                            .or(left_declared)
                            .or(right_inherited)
                            .or(left_inherited);
                        merge_values(left_value, right_member, effective, opts)
                    }
                    None => right_member.clone(),
                };
                out.insert(name.clone(), merged);
            }
            KEY_EXTENSIONS => {
                let merged = match lm.get(KEY_EXTENSIONS) {
                    Some(left_ext) => deep_merge(left_ext, right_member),
                    None => right_member.clone(),
                };
                out.insert(name.clone(), merged);
            }
            _ => {
                // Every other property: right wins.
                out.insert(name.clone(), right_member.clone());
            }
        }
    }

    Ok(DynValue::Object(out))
}

/// Combines two `$value` payloads according to the effective token type.
///
/// Composite types deep-merge object payloads; everything else replaces.
/// Incompatible shapes (object vs scalar) fall back to the right side.
fn merge_values(
    left: &DynValue,
    right: &DynValue,
    effective_type: Option<&str>,
    opts: &MergeOptions,
) -> DynValue {
    let composite = effective_type
        .map(|t| opts.composite_types.contains(t))
        .unwrap_or(false);
    if composite && left.is_object() && right.is_object() {
        deep_merge(left, right)
    } else {
        right.clone()
    }
}

/// Recursive object merge: right members win, objects combine member-wise.
fn deep_merge(left: &DynValue, right: &DynValue) -> DynValue {
    match (left.as_object(), right.as_object()) {
        (Some(lm), Some(rm)) => {
            let mut out = lm.clone();
            for (name, right_member) in rm {
                let merged = match lm.get(name) {
                    Some(left_member) => deep_merge(left_member, right_member),
                    None => right_member.clone(),
                };
                out.insert(name.clone(), merged);
            }
            DynValue::Object(out)
        }
        _ => right.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    fn doc(json: &str) -> TokenDocument {
        TokenDocument::from_json(json).expect("valid document")
    }

    fn to_json(outcome: &MergeOutcome) -> String {
        serde_json::to_string(&outcome.document).expect("serialize")
    }

    #[test]
    fn absent_side_uses_other() {
        let left = doc(r#"{"a": {"$value": 1}}"#);
        let right = doc(r#"{"b": {"$value": 2}}"#);
        let out = merge(&left, &right, &MergeOptions::default()).expect("merge");
        assert!(out.conflicts.is_empty());
        assert!(out.document.root.contains_key("a"));
        assert!(out.document.root.contains_key("b"));
    }

    #[test]
    fn right_token_replaces_scalar_value() {
        let left = doc(r##"{"a": {"$type": "color", "$value": "#000"}}"##);
        let right = doc(r##"{"a": {"$value": "#fff"}}"##);
        let out = merge(&left, &right, &MergeOptions::default()).expect("merge");
        assert_eq!(
            to_json(&out),
            r##"{"a":{"$type":"color","$value":"#fff"}}"##
        );
    }

    #[test]
    fn composite_value_merges_field_by_field() {
        // A shadow layer overriding a single sub-property.
        let left = doc(
            r##"{"sh":{"$type":"shadow","$value":{"color":"#000","offsetX":"2px","offsetY":"2px","blur":"4px"}}}"##,
        );
        let right = doc(r#"{"sh":{"$type":"shadow","$value":{"blur":"8px"}}}"#);
        let out = merge(&left, &right, &MergeOptions::default()).expect("merge");
        assert!(out.conflicts.is_empty());
        let value = out
            .document
            .get_path(&["sh".to_owned(), "$value".to_owned()])
            .expect("value");
        assert_eq!(value.get("blur").and_then(DynValue::as_str), Some("8px"));
        assert_eq!(value.get("color").and_then(DynValue::as_str), Some("#000"));
        assert_eq!(
            value.get("offsetX").and_then(DynValue::as_str),
            Some("2px")
        );
    }

    #[test]
    fn non_composite_object_value_replaces() {
        let left = doc(r#"{"a":{"$type":"other","$value":{"x":1,"y":2}}}"#);
        let right = doc(r#"{"a":{"$type":"other","$value":{"x":9}}}"#);
        let out = merge(&left, &right, &MergeOptions::default()).expect("merge");
        let value = out
            .document
            .get_path(&["a".to_owned(), "$value".to_owned()])
            .expect("value");
        assert_eq!(value.get("y"), None, "non-composite replaces wholesale");
    }

    #[test]
    fn composite_with_incompatible_shapes_right_wins() {
        let left = doc(r#"{"a":{"$type":"shadow","$value":{"blur":"4px"}}}"#);
        let right = doc(r#"{"a":{"$type":"shadow","$value":"none"}}"#);
        let out = merge(&left, &right, &MergeOptions::default()).expect("merge");
        let value = out
            .document
            .get_path(&["a".to_owned(), "$value".to_owned()])
            .expect("value");
        assert_eq!(value.as_str(), Some("none"));
    }

    #[test]
    fn extensions_deep_merge() {
        let left = doc(r#"{"a":{"$value":1,"$extensions":{"org.tool":{"x":1,"keep":true}}}}"#);
        let right = doc(r#"{"a":{"$value":1,"$extensions":{"org.tool":{"x":2}}}}"#);
        let out = merge(&left, &right, &MergeOptions::default()).expect("merge");
        let ext = out
            .document
            .get_path(&["a".to_owned(), "$extensions".to_owned()])
            .expect("extensions");
        let tool = ext.get("org.tool").expect("org.tool");
        assert_eq!(tool.get("x"), Some(&DynValue::Integer(2)));
        assert_eq!(tool.get("keep"), Some(&DynValue::Bool(true)));
    }

    #[test]
    fn description_right_wins() {
        let left = doc(r#"{"a":{"$value":1,"$description":"old"}}"#);
        let right = doc(r#"{"a":{"$value":2,"$description":"new"}}"#);
        let out = merge(&left, &right, &MergeOptions::default()).expect("merge");
        let desc = out
            .document
            .get_path(&["a".to_owned(), "$description".to_owned()])
            .expect("description");
        assert_eq!(desc.as_str(), Some("new"));
    }

    #[test]
    fn type_mismatch_records_conflict_with_both_sides() {
        // A color token layered over a dimension token.
        let left = doc(r#"{"a":{"$type":"dimension","$value":"4px"}}"#);
        let right = doc(r##"{"a":{"$type":"color","$value":"#000"}}"##);
        let out = merge(&left, &right, &MergeOptions::default()).expect("merge");
        assert_eq!(out.conflicts.len(), 1);
        let c = &out.conflicts[0];
        assert_eq!(c.kind, ConflictKind::TypeMismatch);
        assert_eq!(c.path.to_string(), "a");
        assert!(c.left.get(KEY_TYPE).is_some());
        assert!(c.right.get(KEY_TYPE).is_some());
        // prefer_right resolution: right token wins.
        let t = out
            .document
            .get_path(&["a".to_owned(), "$type".to_owned()])
            .expect("type");
        assert_eq!(t.as_str(), Some("color"));
    }

    #[test]
    fn type_mismatch_prefer_left_resolution() {
        let left = doc(r#"{"a":{"$type":"dimension","$value":"4px"}}"#);
        let right = doc(r##"{"a":{"$type":"color","$value":"#000"}}"##);
        let opts = MergeOptions {
            prefer_right: false,
            ..MergeOptions::default()
        };
        let out = merge(&left, &right, &opts).expect("merge");
        assert_eq!(out.conflicts.len(), 1);
        let t = out
            .document
            .get_path(&["a".to_owned(), "$type".to_owned()])
            .expect("type");
        assert_eq!(t.as_str(), Some("dimension"));
    }

    #[test]
    fn one_undefined_type_is_compatible() {
        let left = doc(r#"{"a":{"$value":"4px"}}"#);
        let right = doc(r#"{"a":{"$type":"dimension","$value":"8px"}}"#);
        let out = merge(&left, &right, &MergeOptions::default()).expect("merge");
        assert!(out.conflicts.is_empty());
    }

    #[test]
    fn token_vs_group_conflict() {
        let left = doc(r#"{"a":{"$value":1}}"#);
        let right = doc(r#"{"a":{"child":{"$value":2}}}"#);
        let out = merge(&left, &right, &MergeOptions::default()).expect("merge");
        assert_eq!(out.conflicts.len(), 1);
        assert_eq!(out.conflicts[0].kind, ConflictKind::TokenVsGroup);
        // prefer_right: the group replaces the token.
        assert!(
            out.document
                .get_path(&["a".to_owned(), "child".to_owned()])
                .is_some()
        );
    }

    #[test]
    fn group_vs_token_conflict() {
        let left = doc(r#"{"a":{"child":{"$value":2}}}"#);
        let right = doc(r#"{"a":{"$value":1}}"#);
        let out = merge(&left, &right, &MergeOptions::default()).expect("merge");
        assert_eq!(out.conflicts.len(), 1);
        assert_eq!(out.conflicts[0].kind, ConflictKind::GroupVsToken);
    }

    #[test]
    fn unsafe_mode_aborts_on_first_conflict() {
        let left = doc(r#"{"a":{"$type":"dimension","$value":"4px"}}"#);
        let right = doc(r##"{"a":{"$type":"color","$value":"#000"}}"##);
        let opts = MergeOptions {
            safe: false,
            ..MergeOptions::default()
        };
        let err = merge(&left, &right, &opts).expect_err("must abort");
        assert_eq!(err.conflict.kind, ConflictKind::TypeMismatch);
        assert_eq!(err.conflict.path.to_string(), "a");
    }

    #[test]
    fn group_type_mismatch_is_conflict() {
        let left = doc(r##"{"g":{"$type":"color","a":{"$value":"#000"}}}"##);
        let right = doc(r##"{"g":{"$type":"dimension","a":{"$value":"#111"}}}"##);
        let out = merge(&left, &right, &MergeOptions::default()).expect("merge");
        assert_eq!(out.conflicts.len(), 1);
        assert_eq!(out.conflicts[0].kind, ConflictKind::TypeMismatch);
        assert_eq!(out.conflicts[0].path.to_string(), "g");
    }

    #[test]
    fn exclude_prefix_keeps_left_subtree() {
        let left = doc(r#"{"keep":{"$value":1},"skip":{"$value":1}}"#);
        let right = doc(r#"{"keep":{"$value":2},"skip":{"$value":2}}"#);
        let opts = MergeOptions {
            exclude: vec![TokenPath::from(&["skip"][..])],
            ..MergeOptions::default()
        };
        let out = merge(&left, &right, &opts).expect("merge");
        let keep = out
            .document
            .get_path(&["keep".to_owned(), "$value".to_owned()])
            .expect("keep");
        let skip = out
            .document
            .get_path(&["skip".to_owned(), "$value".to_owned()])
            .expect("skip");
        assert_eq!(keep, &DynValue::Integer(2));
        assert_eq!(skip, &DynValue::Integer(1));
    }

    #[test]
    fn include_prefix_limits_merge() {
        let left = doc(r#"{"in":{"a":{"$value":1}},"out":{"$value":1}}"#);
        let right = doc(r#"{"in":{"a":{"$value":2}},"out":{"$value":2}}"#);
        let opts = MergeOptions {
            include: vec![TokenPath::from(&["in"][..])],
            ..MergeOptions::default()
        };
        let out = merge(&left, &right, &opts).expect("merge");
        let inside = out
            .document
            .get_path(&["in".to_owned(), "a".to_owned(), "$value".to_owned()])
            .expect("in.a");
        let outside = out
            .document
            .get_path(&["out".to_owned(), "$value".to_owned()])
            .expect("out");
        assert_eq!(inside, &DynValue::Integer(2));
        assert_eq!(outside, &DynValue::Integer(1), "outside include: left kept");
    }

    #[test]
    fn types_filter_excludes_right_tokens() {
        let left = doc(r##"{"c":{"$type":"color","$value":"#000"}}"##);
        let right = doc(
            r##"{"c":{"$type":"color","$value":"#fff"},"d":{"$type":"dimension","$value":"4px"}}"##,
        );
        let opts = MergeOptions {
            types: Some(["color".to_owned()].into_iter().collect()),
            ..MergeOptions::default()
        };
        let out = merge(&left, &right, &opts).expect("merge");
        let c = out
            .document
            .get_path(&["c".to_owned(), "$value".to_owned()])
            .expect("c");
        assert_eq!(c.as_str(), Some("#fff"));
        assert!(
            out.document.root.get("d").is_none(),
            "dimension token filtered from the right side"
        );
    }

    #[test]
    fn types_filter_uses_inherited_group_type() {
        let left = doc("{}");
        let right = doc(r##"{"g":{"$type":"color","a":{"$value":"#000"}}}"##);
        let opts = MergeOptions {
            types: Some(["color".to_owned()].into_iter().collect()),
            ..MergeOptions::default()
        };
        // New right-side subtree: admitted wholesale (group copy), the filter
        // applies to token pairs and new right-side tokens.
        let out = merge(&left, &right, &opts).expect("merge");
        assert!(out.document.root.contains_key("g"));
    }

    #[test]
    fn merge_all_folds_left_associatively() {
        let a = doc(r#"{"x":{"$value":1}}"#);
        let b = doc(r#"{"x":{"$value":2},"y":{"$value":2}}"#);
        let c = doc(r#"{"y":{"$value":3}}"#);
        let out = merge_all([&a, &b, &c], &MergeOptions::default()).expect("merge");
        let x = out
            .document
            .get_path(&["x".to_owned(), "$value".to_owned()])
            .expect("x");
        let y = out
            .document
            .get_path(&["y".to_owned(), "$value".to_owned()])
            .expect("y");
        assert_eq!(x, &DynValue::Integer(2));
        assert_eq!(y, &DynValue::Integer(3));
    }

    #[test]
    fn merge_all_empty_sequence_is_empty_document() {
        let out = merge_all([], &MergeOptions::default()).expect("merge");
        assert!(out.document.root.is_empty());
    }

    #[test]
    fn member_order_is_left_then_new_right() {
        let left = doc(r#"{"b":{"$value":1},"a":{"$value":1}}"#);
        let right = doc(r#"{"z":{"$value":2},"a":{"$value":2}}"#);
        let out = merge(&left, &right, &MergeOptions::default()).expect("merge");
        let keys: Vec<&str> = out.document.root.keys().map(String::as_str).collect();
        assert_eq!(keys, ["b", "a", "z"]);
    }
}
