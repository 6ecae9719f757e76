/// The bundler: one permutation through the whole pipeline.
///
/// Stages, in order: load → compose → resolve-external → resolve-all? →
/// convert → write. Cross-file references are resolved per source file
/// *during* composition (external-only mode), so the merged document never
/// contains dangling file references; the optional resolve-all pass then
/// inlines internal references too.
///
/// A failure in one permutation is recorded and the batch moves on; the
/// overall result is one [`BundleRecord`] per permutation. Cancellation is
/// checked at stage boundaries and produces a `cancelled` terminal state
/// rather than an error.
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::convert::{ConvertWarningKind, to_alias_dialect, to_pointer_dialect};
use crate::loader::{DocumentLoader, LoadError, TokenReader, parent_dir};
use crate::manifest::{Permutation, enumerate};
use crate::merge::{MergeOptions, merge};
use crate::model::TokenDocument;
use crate::resolver::{ResolveMode, ResolveOptions, resolve};
use crate::writer::{TokenWriter, WriteOptions};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Output reference dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Leave references as written.
    #[default]
    Preserve,
    /// Rewrite aliases to pointer form.
    Pointer,
    /// Rewrite internal pointers to alias form.
    Alias,
}

/// Configuration for a bundle run.
#[derive(Debug, Clone, Default)]
pub struct BundleOptions {
    /// Run a post-merge external-only resolution pass.
    pub resolve_external: bool,
    /// Resolve all references (internal and alias included) after merging.
    pub resolve_all: bool,
    /// Fail permutations on unresolved references, cycles, and depth
    /// overruns instead of preserving and warning.
    pub strict: bool,
    /// Output reference dialect.
    pub format: OutputFormat,
    /// Directory (or explicit file path when the manifest produces exactly
    /// one permutation) for outputs; defaults to the manifest's directory.
    pub output: Option<String>,
    /// Write through a temp file and rename.
    pub atomic_writes: bool,
}

/// Cooperative cancellation flag, checked at stage boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates an unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`CancellationToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Stage and record types
// ---------------------------------------------------------------------------

/// Pipeline stages, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleStage {
    /// Reading source documents.
    Load,
    /// Folding documents into the accumulator.
    Compose,
    /// External-only reference resolution.
    ResolveExternal,
    /// Full reference resolution.
    ResolveAll,
    /// Dialect conversion.
    Convert,
    /// Writing the output document.
    Write,
}

impl fmt::Display for BundleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => f.write_str("load"),
            Self::Compose => f.write_str("compose"),
            Self::ResolveExternal => f.write_str("resolve-external"),
            Self::ResolveAll => f.write_str("resolve-all"),
            Self::Convert => f.write_str("convert"),
            Self::Write => f.write_str("write"),
        }
    }
}

/// A failure inside one permutation, attributed to a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleError {
    /// Where the pipeline stopped.
    pub stage: BundleStage,
    /// What went wrong.
    pub message: String,
}

impl fmt::Display for BundleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.message)
    }
}

impl std::error::Error for BundleError {}

/// Terminal state of one permutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleStatus {
    /// The output was written.
    Ok,
    /// The cancellation token was raised before completion.
    Cancelled,
    /// A stage failed.
    Error(BundleError),
}

/// The per-permutation result row.
#[derive(Debug, Clone)]
pub struct BundleRecord {
    /// Permutation id.
    pub id: String,
    /// Output path (as handed to the writer; empty when never reached).
    pub output: String,
    /// Terminal state.
    pub status: BundleStatus,
    /// Merge conflicts and resolution/conversion notes.
    pub warnings: Vec<String>,
}

impl BundleRecord {
    /// `true` for a successfully written permutation.
    pub fn is_ok(&self) -> bool {
        matches!(self.status, BundleStatus::Ok)
    }
}

// ---------------------------------------------------------------------------
// Batch entry point
// ---------------------------------------------------------------------------

/// Bundles every permutation of the manifest at `manifest_path`.
///
/// Permutation failures are recorded, not propagated; only a broken
/// manifest aborts the whole batch.
///
/// # Errors
///
/// Returns [`LoadError`] when the manifest itself cannot be loaded,
/// parsed, or shaped.
pub fn bundle_all(
    manifest_path: &str,
    reader: &dyn TokenReader,
    writer: &dyn TokenWriter,
    opts: &BundleOptions,
    cancel: &CancellationToken,
) -> Result<Vec<BundleRecord>, LoadError> {
    let mut loader = DocumentLoader::new(reader);
    let manifest = loader.read_manifest(manifest_path)?;
    let permutations = enumerate(&manifest).map_err(|e| LoadError::Shape {
        path: manifest_path.to_owned(),
        detail: e.to_string(),
    })?;

    let manifest_dir = parent_dir(manifest_path);
    let mut records = Vec::with_capacity(permutations.len());

    for permutation in &permutations {
        if cancel.is_cancelled() {
            records.push(BundleRecord {
                id: permutation.id.clone(),
                output: String::new(),
                status: BundleStatus::Cancelled,
                warnings: Vec::new(),
            });
            continue;
        }
        let record =
            bundle_permutation(&manifest_dir, permutation, &mut loader, writer, opts, cancel);
        tracing::debug!(id = %record.id, ok = record.is_ok(), "permutation finished");
        records.push(record);
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// The composed document for one permutation, before conversion/output.
#[derive(Debug, Clone)]
pub struct ComposeOutcome {
    /// The merged document with external references inlined.
    pub document: TokenDocument,
    /// Resolution diagnostics and merge conflicts, as display strings.
    pub warnings: Vec<String>,
}

/// Outcome of [`compose_permutation`]: finished, or interrupted by the
/// cancellation token.
#[derive(Debug, Clone)]
pub enum ComposeResult {
    /// Composition ran to completion.
    Done(ComposeOutcome),
    /// The cancellation token was raised between files.
    Cancelled,
}

/// Loads and folds a permutation's files into one document.
///
/// External references resolve against each file's own directory before
/// its content merges in (mandatory external-only pass), so the merged
/// document never carries dangling file references.
///
/// # Errors
///
/// Returns [`BundleError`] attributed to the load, resolve-external, or
/// compose stage.
pub fn compose_permutation(
    manifest_dir: &str,
    permutation: &Permutation,
    loader: &mut DocumentLoader<'_>,
    strict: bool,
    cancel: &CancellationToken,
) -> Result<ComposeResult, BundleError> {
    let mut warnings = Vec::new();
    let merge_opts = MergeOptions::default();
    let mut accumulator = TokenDocument::new();

    for file in &permutation.files {
        if cancel.is_cancelled() {
            return Ok(ComposeResult::Cancelled);
        }

        let path = loader.reader().join(manifest_dir, file);
        tracing::debug!(id = %permutation.id, path = %path, "loading source file");
        let document = loader.read_document(&path).map_err(|e| BundleError {
            stage: BundleStage::Load,
            message: e.to_string(),
        })?;

        let resolved = resolve(
            &document,
            loader,
            &ResolveOptions {
                base_path: path.clone(),
                mode: ResolveMode::ExternalOnly,
                strict,
                ..ResolveOptions::default()
            },
        )
        .map_err(|e| BundleError {
            stage: BundleStage::ResolveExternal,
            message: e.to_string(),
        })?;
        warnings.extend(resolved.diagnostics.iter().map(ToString::to_string));

        let outcome = merge(&accumulator, &resolved.document, &merge_opts).map_err(|e| {
            BundleError {
                stage: BundleStage::Compose,
                message: e.to_string(),
            }
        })?;
        warnings.extend(
            outcome
                .conflicts
                .iter()
                .map(|c| format!("merge conflict in {file}: {c}")),
        );
        accumulator = outcome.document;
    }

    Ok(ComposeResult::Done(ComposeOutcome {
        document: accumulator,
        warnings,
    }))
}

// ---------------------------------------------------------------------------
// Single permutation
// ---------------------------------------------------------------------------

/// Runs one permutation through load → compose → resolve → convert → write.
pub fn bundle_permutation(
    manifest_dir: &str,
    permutation: &Permutation,
    loader: &mut DocumentLoader<'_>,
    writer: &dyn TokenWriter,
    opts: &BundleOptions,
    cancel: &CancellationToken,
) -> BundleRecord {
    let fail = |stage: BundleStage, message: String, warnings: Vec<String>| BundleRecord {
        id: permutation.id.clone(),
        output: String::new(),
        status: BundleStatus::Error(BundleError { stage, message }),
        warnings,
    };
    let cancelled = |warnings: Vec<String>| BundleRecord {
        id: permutation.id.clone(),
        output: String::new(),
        status: BundleStatus::Cancelled,
        warnings,
    };

    let composed = match compose_permutation(manifest_dir, permutation, loader, opts.strict, cancel)
    {
        Ok(ComposeResult::Done(outcome)) => outcome,
        Ok(ComposeResult::Cancelled) => return cancelled(Vec::new()),
        Err(e) => return fail(e.stage, e.message, Vec::new()),
    };
    let mut warnings = composed.warnings;
    let mut accumulator = composed.document;

    if cancel.is_cancelled() {
        return cancelled(warnings);
    }

    // Optional post-merge external pass (covers references introduced by
    // the merge itself, e.g. from lenient per-file failures).
    // External references in the merged document resolve against the
    // manifest's directory.
    let merged_base = loader.reader().join(manifest_dir, "bundle.json");

    if opts.resolve_external {
        match resolve(
            &accumulator,
            loader,
            &ResolveOptions {
                base_path: merged_base.clone(),
                mode: ResolveMode::ExternalOnly,
                strict: opts.strict,
                ..ResolveOptions::default()
            },
        ) {
            Ok(outcome) => {
                warnings.extend(outcome.diagnostics.iter().map(ToString::to_string));
                accumulator = outcome.document;
            }
            Err(e) => return fail(BundleStage::ResolveExternal, e.to_string(), warnings),
        }
    }

    if opts.resolve_all {
        if cancel.is_cancelled() {
            return cancelled(warnings);
        }
        match resolve(
            &accumulator,
            loader,
            &ResolveOptions {
                base_path: merged_base.clone(),
                mode: ResolveMode::All,
                strict: opts.strict,
                ..ResolveOptions::default()
            },
        ) {
            Ok(outcome) => {
                warnings.extend(outcome.diagnostics.iter().map(ToString::to_string));
                accumulator = outcome.document;
            }
            Err(e) => return fail(BundleStage::ResolveAll, e.to_string(), warnings),
        }
    }

    if cancel.is_cancelled() {
        return cancelled(warnings);
    }

    // Dialect conversion.
    let document = match opts.format {
        OutputFormat::Preserve => accumulator,
        OutputFormat::Pointer => {
            let outcome = to_pointer_dialect(&accumulator);
            warnings.extend(outcome.warnings.iter().map(ToString::to_string));
            outcome.document
        }
        OutputFormat::Alias => {
            let outcome = to_alias_dialect(&accumulator);
            let has_external = outcome
                .warnings
                .iter()
                .any(|w| w.kind == ConvertWarningKind::ExternalUnsupported);
            warnings.extend(outcome.warnings.iter().map(ToString::to_string));
            if opts.strict && has_external {
                return fail(
                    BundleStage::Convert,
                    "alias output requested but external references remain".to_owned(),
                    warnings,
                );
            }
            outcome.document
        }
    };

    if cancel.is_cancelled() {
        return cancelled(warnings);
    }

    // Write.
    let output_path = output_path_for(manifest_dir, permutation, opts);
    let bytes = match serde_json::to_vec_pretty(&document) {
        Ok(mut bytes) => {
            bytes.push(b'\n');
            bytes
        }
        Err(e) => return fail(BundleStage::Write, e.to_string(), warnings),
    };
    tracing::debug!(id = %permutation.id, path = %output_path, "writing bundle");
    if let Err(e) = writer.write_bytes(
        &output_path,
        &bytes,
        &WriteOptions {
            atomic: opts.atomic_writes,
            backup: false,
        },
    ) {
        return fail(BundleStage::Write, e.to_string(), warnings);
    }

    BundleRecord {
        id: permutation.id.clone(),
        output: output_path,
        status: BundleStatus::Ok,
        warnings,
    }
}

/// Where a permutation's output goes: an explicit per-spec `output` joins
/// under the output root (or manifest directory); synthesized names do too.
fn output_path_for(manifest_dir: &str, permutation: &Permutation, opts: &BundleOptions) -> String {
    let name = permutation.output_name();
    let root = opts.output.as_deref().unwrap_or(manifest_dir);
    if root.is_empty() {
        crate::loader::normalize_path(&name)
    } else {
        crate::loader::normalize_path(&format!("{root}/{name}"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
