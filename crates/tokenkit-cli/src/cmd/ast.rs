/// `tokenkit ast` — emit the annotated reference graph for every
/// permutation of a manifest as JSON.
///
/// The output is an array of `{id, files, graph}` entries in enumeration
/// order, written to `--output` or printed to stdout.
use std::path::Path;

use tokenkit_core::{
    CancellationToken, ComposeResult, DocumentLoader, FsReader, FsWriter, LoadError, TokenWriter,
    WriteOptions, build_graph, compose_permutation, enumerate, parent_dir,
};

use crate::error::CliError;

/// Runs the ast subcommand.
///
/// # Errors
///
/// [`CliError::Load`] for a broken manifest or source file, and
/// [`CliError::Write`] when `--output` cannot be written.
pub fn run(manifest: &Path, output: Option<&Path>) -> Result<(), CliError> {
    let reader = FsReader;
    let mut loader = DocumentLoader::new(&reader);
    let manifest_path = manifest.to_string_lossy().into_owned();
    let parsed = loader.read_manifest(&manifest_path)?;

    let permutations = enumerate(&parsed).map_err(|e| {
        CliError::Load(LoadError::Shape {
            path: manifest_path.clone(),
            detail: e.to_string(),
        })
    })?;

    let manifest_dir = parent_dir(&manifest_path);
    let cancel = CancellationToken::new();
    let mut entries = Vec::with_capacity(permutations.len());

    for permutation in &permutations {
        let composed =
            compose_permutation(&manifest_dir, permutation, &mut loader, false, &cancel)
                .map_err(|e| CliError::Compose {
                    id: permutation.id.clone(),
                    detail: e.to_string(),
                })?;
        let ComposeResult::Done(outcome) = composed else {
            continue;
        };
        let graph = build_graph(&outcome.document);
        entries.push(serde_json::json!({
            "id": permutation.id,
            "files": permutation.files,
            "graph": graph,
        }));
    }

    let rendered = serde_json::to_string_pretty(&entries).map_err(|e| CliError::Write {
        path: output
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| "<stdout>".to_owned()),
        detail: e.to_string(),
    })?;

    match output {
        Some(path) => {
            let path_str = path.to_string_lossy().into_owned();
            let mut bytes = rendered.into_bytes();
            bytes.push(b'\n');
            FsWriter
                .write_bytes(&path_str, &bytes, &WriteOptions::default())
                .map_err(|e| CliError::Write {
                    path: e.path,
                    detail: e.detail,
                })?;
        }
        None => println!("{rendered}"),
    }

    Ok(())
}
