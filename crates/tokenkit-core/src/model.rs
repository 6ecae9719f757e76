/// Token document model: structural classification of tree nodes.
///
/// Tokens and groups are structural, not nominal. A node is a token because
/// it carries a `$value` (or a direct `$ref`), and a group because it has at
/// least one non-metadata child and no `$value`. [`classify`] is the single
/// place that makes that call; every other component goes through it.
///
/// # Reserved member names
///
/// `$value`, `$type`, `$description`, `$extensions`, `$ref`, `$schema` have
/// fixed meanings. Any other `$`-prefixed member is preserved through all
/// transformations but never counted as a child by the structural predicates.
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::dynvalue::{DynMap, DynValue};

/// The `$value` member of a token.
pub const KEY_VALUE: &str = "$value";
/// The `$type` member of a token or group.
pub const KEY_TYPE: &str = "$type";
/// The `$description` member of a token or group.
pub const KEY_DESCRIPTION: &str = "$description";
/// The `$extensions` member of a token.
pub const KEY_EXTENSIONS: &str = "$extensions";
/// The `$ref` member of a reference container.
pub const KEY_REF: &str = "$ref";
/// The top-level `$schema` member, stripped before merging.
pub const KEY_SCHEMA: &str = "$schema";

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// The structural role of a node within a token tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A leaf carrying a `$value` or a direct `$ref`.
    Token,
    /// An interior node with at least one non-metadata child and no `$value`.
    Group,
    /// Neither: a scalar, an array, or an object of metadata only.
    Other,
}

/// Returns `true` if `name` is a metadata member (`$`-prefixed).
pub fn is_metadata_key(name: &str) -> bool {
    name.starts_with('$')
}

/// Classifies a node as token, group, or neither.
///
/// The predicate order matters: a `$value` (or direct `$ref`) always wins,
/// so an object carrying both a `$value` and plain children is a token and
/// the plain children are ignored by structural traversal.
pub fn classify(node: &DynValue) -> NodeKind {
    let Some(map) = node.as_object() else {
        return NodeKind::Other;
    };
    if map.contains_key(KEY_VALUE) || map.contains_key(KEY_REF) {
        return NodeKind::Token;
    }
    if map.keys().any(|k| !is_metadata_key(k)) {
        return NodeKind::Group;
    }
    NodeKind::Other
}

/// Returns `true` if `node` is a token (has a `$value` or a direct `$ref`).
pub fn is_token(node: &DynValue) -> bool {
    classify(node) == NodeKind::Token
}

/// Returns `true` if `node` is a group (≥1 non-metadata child, no `$value`).
pub fn is_group(node: &DynValue) -> bool {
    classify(node) == NodeKind::Group
}

/// Returns the token's effective type: its declared `$type`, else the type
/// inherited from the nearest enclosing group that declares one.
pub fn effective_type<'a>(token: &'a DynValue, inherited: Option<&'a str>) -> Option<&'a str> {
    token
        .get(KEY_TYPE)
        .and_then(DynValue::as_str)
        .or(inherited)
}

/// Returns the declared `$type` of a node, if any.
pub fn declared_type(node: &DynValue) -> Option<&str> {
    node.get(KEY_TYPE).and_then(DynValue::as_str)
}

// ---------------------------------------------------------------------------
// TokenDocument
// ---------------------------------------------------------------------------

/// The root group of a token tree.
///
/// Serialization is transparent: the document *is* its root object. Member
/// order is preserved end to end (see [`crate::dynvalue::DynValue`]).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TokenDocument {
    /// The root group's members.
    pub root: DynMap,
}

impl TokenDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing root map.
    pub fn from_root(root: DynMap) -> Self {
        Self { root }
    }

    /// Parses a document from JSON text, stripping a top-level `$schema`.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error when the text is not valid
    /// JSON or the top level is not an object.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let mut doc: Self = serde_json::from_str(text)?;
        doc.root.shift_remove(KEY_SCHEMA);
        Ok(doc)
    }

    /// Returns the node at `segments`, walking group members only.
    ///
    /// An empty segment list returns `None`; the root is not addressable as
    /// a value. A final `$value` segment descends into the token's value.
    pub fn get_path(&self, segments: &[String]) -> Option<&DynValue> {
        let (first, rest) = segments.split_first()?;
        let mut current = self.root.get(first)?;
        for seg in rest {
            current = current.get(seg)?;
        }
        Some(current)
    }

    /// Returns the node at `segments` mutably. See [`TokenDocument::get_path`].
    pub fn get_path_mut(&mut self, segments: &[String]) -> Option<&mut DynValue> {
        let (first, rest) = segments.split_first()?;
        let mut current = self.root.get_mut(first)?;
        for seg in rest {
            current = current.as_object_mut()?.get_mut(seg)?;
        }
        Some(current)
    }

    /// Returns the root wrapped as a [`DynValue::Object`], cloning the map.
    pub fn as_value(&self) -> DynValue {
        DynValue::Object(self.root.clone())
    }
}

impl Serialize for TokenDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DynValue::Object(self.root.clone()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TokenDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = DynValue::deserialize(deserializer)?;
        match value {
            DynValue::Object(root) => Ok(Self { root }),
            DynValue::Null
            | DynValue::Bool(_)
            | DynValue::Integer(_)
            | DynValue::UnsignedInteger(_)
            | DynValue::Float(_)
            | DynValue::String(_)
            | DynValue::Array(_) => Err(serde::de::Error::custom(
                "token document root must be an object",
            )),
        }
    }
}
