/// Reference resolution: substituting targets for `$ref` containers and
/// alias strings, within and across files.
///
/// The resolver is a single depth-first visitor over a cloned document.
/// Substitution semantics follow the target spelling: a token-level pointer
/// inlines the whole token object, a value-level pointer (trailing
/// `/$value`) or an alias inlines just the value payload.
///
/// Cycle control keys on `(source, reference)` pairs currently being
/// resolved; re-encountering one is a cycle. Depth is capped independently
/// by counting active resolution frames.
///
/// External targets load through the injected [`DocumentLoader`], relative
/// to the referring document's directory, and their reference maps are
/// memoized per file.
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::dynvalue::{DynMap, DynValue};
use crate::loader::{DocumentLoader, LoadError, parent_dir};
use crate::model::{KEY_REF, KEY_VALUE, NodeKind, TokenDocument, classify, is_metadata_key};
use crate::path::TokenPath;
use crate::reference::{ParsedReference, is_alias_syntax, parse_reference};

/// Default resolution depth cap.
pub const DEFAULT_MAX_DEPTH: usize = 10;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Which references a resolution pass touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveMode {
    /// Leave the document untouched.
    Off,
    /// Resolve everything: internal, alias, and external.
    #[default]
    All,
    /// Resolve only external references; internal and alias forms are
    /// preserved. This is the composition mode: files merge with their
    /// cross-file references already inlined.
    ExternalOnly,
}

/// Configuration for one resolution pass.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Path of the document being resolved; external references resolve
    /// relative to its directory.
    pub base_path: String,
    /// Which reference kinds to substitute.
    pub mode: ResolveMode,
    /// Fail on unresolved targets, cycles, depth overruns, and malformed
    /// tokens instead of preserving and warning.
    pub strict: bool,
    /// Maximum number of nested resolution frames.
    pub max_depth: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            mode: ResolveMode::All,
            strict: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors and diagnostics
// ---------------------------------------------------------------------------

/// A strict-mode resolution failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// A reference target was not found.
    Unresolved {
        /// Pointer of the node containing the reference.
        source: String,
        /// The reference as written.
        reference: String,
    },
    /// A reference chain closed on itself. The chain lists the references
    /// in resolution order, ending with the one that closed the loop.
    Cycle {
        /// The references forming the cycle.
        chain: Vec<String>,
    },
    /// Nested resolution exceeded [`ResolveOptions::max_depth`].
    DepthExceeded {
        /// Pointer of the node where the limit was hit.
        source: String,
        /// The configured limit.
        limit: usize,
    },
    /// A token carries both `$value` and `$ref`.
    MalformedToken {
        /// Pointer of the offending token.
        source: String,
    },
    /// An external document failed to load or parse.
    Load(LoadError),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved { source, reference } => {
                write!(f, "unresolved reference {reference:?} at {source}")
            }
            Self::Cycle { chain } => {
                write!(f, "reference cycle: {}", chain.join(" -> "))
            }
            Self::DepthExceeded { source, limit } => {
                write!(f, "reference depth exceeded {limit} at {source}")
            }
            Self::MalformedToken { source } => {
                write!(f, "token at {source} has both $value and $ref")
            }
            Self::Load(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ResolveError {}

impl From<LoadError> for ResolveError {
    fn from(e: LoadError) -> Self {
        Self::Load(e)
    }
}

/// A lenient-mode note: something was preserved instead of resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveDiagnostic {
    /// Pointer of the node the note refers to.
    pub source: String,
    /// What happened.
    pub message: String,
}

impl fmt::Display for ResolveDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.message)
    }
}

/// The product of a resolution pass.
#[derive(Debug, Clone)]
pub struct ResolveOutcome {
    /// The document with substitutions applied.
    pub document: TokenDocument,
    /// Lenient-mode diagnostics (empty in strict mode, which fails instead).
    pub diagnostics: Vec<ResolveDiagnostic>,
}

// ---------------------------------------------------------------------------
// Reference maps
// ---------------------------------------------------------------------------

/// Pointer → value map over one document: token-level entries map to the
/// token object, value-level entries (`…/$value`) to the payload.
type RefMap = HashMap<String, DynValue>;

fn build_ref_map(doc: &TokenDocument) -> RefMap {
    let mut map = RefMap::new();
    collect_entries(&doc.root, &TokenPath::root(), &mut map);
    map
}

fn collect_entries(members: &DynMap, path: &TokenPath, map: &mut RefMap) {
    for (name, node) in members {
        if is_metadata_key(name) {
            continue;
        }
        let child_path = path.child(name);
        match classify(node) {
            NodeKind::Token => {
                let pointer = child_path.to_pointer();
                if let Some(value) = node.get(KEY_VALUE) {
                    map.insert(format!("{pointer}/{KEY_VALUE}"), value.clone());
                }
                map.insert(pointer, node.clone());
            }
            NodeKind::Group => {
                if let Some(child_members) = node.as_object() {
                    collect_entries(child_members, &child_path, map);
                }
            }
            NodeKind::Other => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Resolves references in `doc` according to `opts`.
///
/// Returns a new document; the input is never mutated. `mode = Off` returns
/// a plain clone.
///
/// # Errors
///
/// In strict mode: [`ResolveError::Unresolved`], [`ResolveError::Cycle`],
/// [`ResolveError::DepthExceeded`], [`ResolveError::MalformedToken`].
/// In any mode, a broken external file surfaces as [`ResolveError::Load`].
pub fn resolve(
    doc: &TokenDocument,
    loader: &mut DocumentLoader<'_>,
    opts: &ResolveOptions,
) -> Result<ResolveOutcome, ResolveError> {
    if opts.mode == ResolveMode::Off {
        return Ok(ResolveOutcome {
            document: doc.clone(),
            diagnostics: Vec::new(),
        });
    }

    let root_ctx = Context {
        file: opts.base_path.clone(),
        dir: parent_dir(&opts.base_path),
        refs: Rc::new(build_ref_map(doc)),
    };

    let mut resolver = Resolver {
        loader,
        opts,
        stack: Vec::new(),
        stack_keys: HashSet::new(),
        external_maps: HashMap::new(),
        diagnostics: Vec::new(),
    };

    let mut root = DynMap::new();
    for (name, node) in &doc.root {
        let source = TokenPath::root().child(name).to_pointer();
        let resolved = resolver.visit(node, &root_ctx, &source)?;
        root.insert(name.clone(), resolved);
    }

    Ok(ResolveOutcome {
        document: TokenDocument::from_root(root),
        diagnostics: resolver.diagnostics,
    })
}

// ---------------------------------------------------------------------------
// Resolver internals
// ---------------------------------------------------------------------------

/// The document a node is being resolved within.
#[derive(Clone)]
struct Context {
    /// Canonical file path ("" for the in-memory root document).
    file: String,
    /// Directory external references resolve against.
    dir: String,
    /// The document's reference map.
    refs: Rc<RefMap>,
}

struct Resolver<'a, 'r> {
    loader: &'a mut DocumentLoader<'r>,
    opts: &'a ResolveOptions,
    /// Active `(source, reference)` frames, innermost last.
    stack: Vec<(String, String)>,
    stack_keys: HashSet<(String, String)>,
    /// Memoized contexts (document + reference map) for loaded files.
    external_maps: HashMap<String, Context>,
    diagnostics: Vec<ResolveDiagnostic>,
}

impl Resolver<'_, '_> {
    fn warn(&mut self, source: &str, message: String) {
        self.diagnostics.push(ResolveDiagnostic {
            source: source.to_owned(),
            message,
        });
    }

    /// The depth-first visitor.
    fn visit(
        &mut self,
        node: &DynValue,
        ctx: &Context,
        source: &str,
    ) -> Result<DynValue, ResolveError> {
        match node {
            DynValue::Object(map) => {
                if let Some(raw) = map.get(KEY_REF).and_then(DynValue::as_str) {
                    if map.contains_key(KEY_VALUE) {
                        if self.opts.strict {
                            return Err(ResolveError::MalformedToken {
                                source: source.to_owned(),
                            });
                        }
                        self.warn(
                            source,
                            "token has both $value and $ref; $ref wins".to_owned(),
                        );
                    }
                    let raw = raw.to_owned();
                    return self.resolve_ref(node, &raw, ctx, source);
                }
                let mut out = DynMap::new();
                for (name, member) in map {
                    let child_source = format!("{source}/{name}");
                    let resolved = self.visit(member, ctx, &child_source)?;
                    out.insert(name.clone(), resolved);
                }
                Ok(DynValue::Object(out))
            }
            DynValue::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.visit(item, ctx, source)?);
                }
                Ok(DynValue::Array(out))
            }
            DynValue::String(s) if is_alias_syntax(s) => {
                let raw = s.clone();
                self.resolve_ref(node, &raw, ctx, source)
            }
            DynValue::Null
            | DynValue::Bool(_)
            | DynValue::Integer(_)
            | DynValue::UnsignedInteger(_)
            | DynValue::Float(_)
            | DynValue::String(_) => Ok(node.clone()),
        }
    }

    /// Resolves one reference, substituting the target or preserving the
    /// original per mode/strictness.
    fn resolve_ref(
        &mut self,
        original: &DynValue,
        raw: &str,
        ctx: &Context,
        source: &str,
    ) -> Result<DynValue, ResolveError> {
        let parsed = parse_reference(raw);

        if self.opts.mode == ResolveMode::ExternalOnly
            && !matches!(parsed, ParsedReference::External { .. })
        {
            return Ok(original.clone());
        }

        let key = (format!("{}!{source}", ctx.file), raw.to_owned());
        if self.stack_keys.contains(&key) {
            let mut chain: Vec<String> = self.stack.iter().map(|(_, r)| r.clone()).collect();
            chain.push(raw.to_owned());
            if self.opts.strict {
                return Err(ResolveError::Cycle { chain });
            }
            self.warn(source, format!("reference cycle through {raw:?}; preserved"));
            return Ok(original.clone());
        }

        if self.stack.len() >= self.opts.max_depth {
            if self.opts.strict {
                return Err(ResolveError::DepthExceeded {
                    source: source.to_owned(),
                    limit: self.opts.max_depth,
                });
            }
            self.warn(
                source,
                format!("reference depth exceeded {}; preserved", self.opts.max_depth),
            );
            return Ok(original.clone());
        }

        self.stack.push(key.clone());
        self.stack_keys.insert(key.clone());
        let result = self.resolve_parsed(original, &parsed, raw, ctx, source);
        self.stack.pop();
        self.stack_keys.remove(&key);
        result
    }

    fn resolve_parsed(
        &mut self,
        original: &DynValue,
        parsed: &ParsedReference,
        raw: &str,
        ctx: &Context,
        source: &str,
    ) -> Result<DynValue, ResolveError> {
        match parsed {
            ParsedReference::Internal(pointer) => {
                self.substitute_local(original, pointer, false, raw, ctx, source)
            }
            ParsedReference::Alias(dotted) => {
                let pointer = TokenPath::from_dotted(dotted).to_pointer();
                self.substitute_local(original, &pointer, true, raw, ctx, source)
            }
            ParsedReference::External { file, pointer } => {
                self.substitute_external(original, file, pointer.as_deref(), raw, ctx, source)
            }
        }
    }

    /// Same-document lookup. Aliases are value-targeted: the `…/$value`
    /// entry is preferred, falling back to the token object for tokens that
    /// reference directly and have no own value.
    fn substitute_local(
        &mut self,
        original: &DynValue,
        pointer: &str,
        value_targeted: bool,
        raw: &str,
        ctx: &Context,
        source: &str,
    ) -> Result<DynValue, ResolveError> {
        let found = if value_targeted {
            ctx.refs
                .get(&format!("{pointer}/{KEY_VALUE}"))
                .or_else(|| ctx.refs.get(pointer))
        } else {
            ctx.refs.get(pointer)
        };

        match found {
            Some(target) => {
                let target = target.clone();
                // The substituted content may itself contain references.
                self.visit(&target, ctx, pointer)
            }
            None => {
                if self.opts.strict {
                    return Err(ResolveError::Unresolved {
                        source: source.to_owned(),
                        reference: raw.to_owned(),
                    });
                }
                self.warn(source, format!("unresolved reference {raw:?}; preserved"));
                Ok(original.clone())
            }
        }
    }

    /// Cross-file lookup through the loader, memoized per target file.
    fn substitute_external(
        &mut self,
        original: &DynValue,
        file: &str,
        pointer: Option<&str>,
        raw: &str,
        ctx: &Context,
        source: &str,
    ) -> Result<DynValue, ResolveError> {
        let target_path = self.loader.reader().join(&ctx.dir, file);

        let target_ctx = match self.external_maps.get(&target_path) {
            Some(cached) => cached.clone(),
            None => {
                let doc = match self.loader.read_document(&target_path) {
                    Ok(doc) => doc,
                    Err(e @ LoadError::Io { .. }) => {
                        // A missing file is an unresolved target; anything
                        // that parsed wrong is fatal regardless of mode.
                        if self.opts.strict {
                            return Err(ResolveError::Unresolved {
                                source: source.to_owned(),
                                reference: raw.to_owned(),
                            });
                        }
                        self.warn(source, format!("cannot load {target_path}: {e}; preserved"));
                        return Ok(original.clone());
                    }
                    Err(e) => return Err(ResolveError::Load(e)),
                };
                let new_ctx = Context {
                    file: target_path.clone(),
                    dir: parent_dir(&target_path),
                    refs: Rc::new(build_ref_map(&doc)),
                };
                self.external_maps
                    .insert(target_path.clone(), new_ctx.clone());
                new_ctx
            }
        };

        match pointer {
            Some(fragment) => {
                // Exact spelling first, then the token-level spelling of a
                // `…/$value` fragment (direct-$ref targets have no own
                // value entry).
                let token_level = TokenPath::from_pointer_token_level(fragment).to_pointer();
                let found = target_ctx
                    .refs
                    .get(fragment)
                    .or_else(|| target_ctx.refs.get(&token_level))
                    .cloned();
                match found {
                    Some(target) => self.visit(&target, &target_ctx, fragment),
                    None => {
                        if self.opts.strict {
                            return Err(ResolveError::Unresolved {
                                source: source.to_owned(),
                                reference: raw.to_owned(),
                            });
                        }
                        self.warn(source, format!("unresolved reference {raw:?}; preserved"));
                        Ok(original.clone())
                    }
                }
            }
            None => {
                // Whole-document reference: inline the root object.
                let doc = self.loader.read_document(&target_path)?;
                let root = DynValue::Object(doc.root);
                self.visit(&root, &target_ctx, "#")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
