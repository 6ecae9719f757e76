/// Validation: pluggable structural checks plus reference integrity.
///
/// The engine does not ship a JSON Schema engine; instead it accepts any
/// [`StructuralValidator`] and combines its findings with what the graph
/// layer knows about references (unresolved targets, cycles, depth) into a
/// single [`ValidationReport`]. The built-in [`BasicStructuralValidator`]
/// covers document well-formedness without any schema.
///
/// Validation never fails fast: all findings are collected, and `strict`
/// upgrades reference warnings to errors.
use std::fmt;

use serde::Serialize;

use crate::dynvalue::{DynMap, DynValue};
use crate::graph::{GraphStats, build_graph};
use crate::model::{KEY_REF, KEY_TYPE, KEY_VALUE, NodeKind, TokenDocument, classify, is_metadata_key};
use crate::path::TokenPath;
use crate::resolver::DEFAULT_MAX_DEPTH;

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

/// The weight of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The document is unusable as written.
    Error,
    /// Suspect but usable.
    Warning,
    /// Informational only.
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Warning => f.write_str("warning"),
            Self::Info => f.write_str("info"),
        }
    }
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// Pointer of the offending node (`#` for document-level findings).
    pub path: String,
    /// Human-readable description.
    pub message: String,
    /// Finding weight.
    pub severity: Severity,
}

impl Issue {
    /// Constructs an [`Issue`].
    pub fn new(path: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity,
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level_char = match self.severity {
            Severity::Error => 'E',
            Severity::Warning => 'W',
            Severity::Info => 'I',
        };
        write!(f, "[{level_char}] {}: {}", self.path, self.message)
    }
}

// ---------------------------------------------------------------------------
// Pluggable validator
// ---------------------------------------------------------------------------

/// A structural validator the engine can consume without knowing how it
/// works (JSON Schema, hand-rolled rules, anything).
pub trait StructuralValidator {
    /// Returns all findings for `doc`.
    fn validate(&self, doc: &TokenDocument) -> Vec<Issue>;
}

/// Schema-free well-formedness checks:
///
/// - a node carrying both `$value` and `$ref` (error);
/// - a `$type` that is not a string (error);
/// - a group member that is neither token, group, nor metadata (warning);
/// - an empty object member (warning).
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicStructuralValidator;

impl StructuralValidator for BasicStructuralValidator {
    fn validate(&self, doc: &TokenDocument) -> Vec<Issue> {
        let mut issues = Vec::new();
        walk(&doc.root, &TokenPath::root(), &mut issues);
        issues
    }
}

fn walk(members: &DynMap, path: &TokenPath, issues: &mut Vec<Issue>) {
    for (name, node) in members {
        if is_metadata_key(name) {
            continue;
        }
        let child_path = path.child(name);
        let pointer = child_path.to_pointer();
        match node {
            DynValue::Object(map) => {
                if map.contains_key(KEY_VALUE) && map.contains_key(KEY_REF) {
                    issues.push(Issue::new(
                        &pointer,
                        "token has both $value and $ref",
                        Severity::Error,
                    ));
                }
                if let Some(t) = map.get(KEY_TYPE) {
                    if !t.is_string() {
                        issues.push(Issue::new(&pointer, "$type must be a string", Severity::Error));
                    }
                }
                match classify(node) {
                    NodeKind::Token => {}
                    NodeKind::Group => walk(map, &child_path, issues),
                    NodeKind::Other => {
                        if map.is_empty() {
                            issues.push(Issue::new(&pointer, "empty group", Severity::Warning));
                        } else {
                            issues.push(Issue::new(
                                &pointer,
                                "object is neither a token nor a group",
                                Severity::Warning,
                            ));
                        }
                    }
                }
            }
            DynValue::Null
            | DynValue::Bool(_)
            | DynValue::Integer(_)
            | DynValue::UnsignedInteger(_)
            | DynValue::Float(_)
            | DynValue::String(_)
            | DynValue::Array(_) => {
                issues.push(Issue::new(
                    &pointer,
                    "group member must be an object",
                    Severity::Warning,
                ));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Options for a validation pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationOptions {
    /// Upgrade reference warnings (unresolved, cycle, depth) to errors.
    pub strict: bool,
}

/// The combined validation result for one document.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// `true` when no error-severity findings exist.
    pub valid: bool,
    /// Error findings.
    pub errors: Vec<Issue>,
    /// Warning and info findings.
    pub warnings: Vec<Issue>,
    /// Graph statistics gathered along the way.
    pub stats: GraphStats,
}

impl ValidationReport {
    /// Total number of findings.
    pub fn len(&self) -> usize {
        self.errors.len() + self.warnings.len()
    }

    /// `true` when there are no findings at all.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// Runs `validator` over `doc` and folds in reference-integrity findings
/// from the graph: unresolved references, cycles, and chains deeper than
/// the resolver's depth cap.
pub fn validate_document(
    doc: &TokenDocument,
    validator: &dyn StructuralValidator,
    opts: ValidationOptions,
) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for issue in validator.validate(doc) {
        match issue.severity {
            Severity::Error => errors.push(issue),
            Severity::Warning | Severity::Info => warnings.push(issue),
        }
    }

    let graph = build_graph(doc);

    let ref_severity = if opts.strict {
        Severity::Error
    } else {
        Severity::Warning
    };
    let mut push_ref_issue = |issue: Issue| {
        if opts.strict {
            errors.push(issue);
        } else {
            warnings.push(issue);
        }
    };

    for edge in &graph.edges {
        if !edge.valid {
            push_ref_issue(Issue::new(
                edge.from.to_pointer(),
                format!("unresolved reference {:?}", edge.raw),
                ref_severity,
            ));
        }
    }

    for cycle in &graph.cycles {
        let chain = cycle
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ");
        let head = cycle
            .first()
            .map(TokenPath::to_pointer)
            .unwrap_or_else(|| "#".to_owned());
        push_ref_issue(Issue::new(
            head,
            format!("reference cycle: {chain}"),
            ref_severity,
        ));
    }

    for token in &graph.tokens {
        if token.reference_depth > DEFAULT_MAX_DEPTH as i32 {
            push_ref_issue(Issue::new(
                token.path.to_pointer(),
                format!(
                    "reference chain depth {} exceeds {DEFAULT_MAX_DEPTH}",
                    token.reference_depth
                ),
                ref_severity,
            ));
        }
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
        stats: graph.stats,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
