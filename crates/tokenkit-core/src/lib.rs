#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod bundler;
pub mod convert;
pub mod dynvalue;
pub mod graph;
pub mod loader;
pub mod manifest;
pub mod merge;
pub mod model;
pub mod path;
pub mod reference;
pub mod resolver;
pub mod validate;
pub mod writer;

pub use bundler::{
    BundleError, BundleOptions, BundleRecord, BundleStage, BundleStatus, CancellationToken,
    ComposeOutcome, ComposeResult, OutputFormat, bundle_all, bundle_permutation,
    compose_permutation,
};
pub use convert::{
    ConvertOutcome, ConvertWarning, ConvertWarningKind, convert_alias_to_pointer,
    convert_pointer_to_alias, to_alias_dialect, to_pointer_dialect,
};
pub use dynvalue::{DynMap, DynValue};
pub use graph::{GraphStats, GroupNode, ReferenceEdge, TokenGraph, TokenNode, build_graph};
pub use loader::{
    DocumentLoader, FsReader, LoadError, MemoryReader, TokenReader, normalize_path, parent_dir,
};
pub use manifest::{
    GenerateSelection, GenerateSpec, Manifest, ManifestError, Modifier, Permutation, Selection,
    SetEntry, enumerate,
};
pub use merge::{
    COMPOSITE_TYPES, ConflictKind, MergeConflict, MergeError, MergeOptions, MergeOutcome, merge,
    merge_all,
};
pub use model::{NodeKind, TokenDocument, classify, effective_type, is_group, is_token};
pub use path::TokenPath;
pub use reference::{ParsedReference, RefKind, parse_reference};
pub use resolver::{
    DEFAULT_MAX_DEPTH, ResolveDiagnostic, ResolveError, ResolveMode, ResolveOptions,
    ResolveOutcome, resolve,
};
pub use validate::{
    BasicStructuralValidator, Issue, Severity, StructuralValidator, ValidationOptions,
    ValidationReport, validate_document,
};
pub use writer::{FsWriter, MemoryWriter, TokenWriter, WriteError, WriteOptions};

/// Returns the current version of the tokenkit-core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
