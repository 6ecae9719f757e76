/// `tokenkit bundle` — compose and write every permutation of a manifest.
///
/// `--theme` and `--mode` pin the like-named modifiers, shrinking the
/// permutation set; everything else fans out as the manifest dictates.
/// Results print one line per permutation to stdout; warnings and failures
/// go to stderr.
use std::path::Path;

use tokenkit_core::{
    BundleOptions, BundleStatus, CancellationToken, DocumentLoader, FsReader, FsWriter, LoadError,
    Manifest, Permutation, Selection, bundle_permutation, enumerate, parent_dir,
};

use crate::cli::RefFormat;
use crate::error::CliError;

/// Everything the bundle subcommand needs, bundled for the dispatcher.
pub struct BundleArgs<'a> {
    /// Manifest path.
    pub manifest: &'a Path,
    /// Optional pin for the `theme` modifier.
    pub theme: Option<&'a str>,
    /// Optional pin for the `mode` modifier.
    pub mode: Option<&'a str>,
    /// Output reference dialect.
    pub format: RefFormat,
    /// Inline all references after merging.
    pub resolve_refs: bool,
    /// Extra post-merge external resolution pass.
    pub resolve_external: bool,
    /// Output directory override.
    pub output: Option<&'a Path>,
    /// Strict reference handling.
    pub strict: bool,
    /// Suppress per-permutation output lines.
    pub quiet: bool,
}

/// Runs the bundle subcommand.
///
/// # Errors
///
/// [`CliError::Load`] for a broken manifest,
/// [`CliError::UnknownSelection`] for a bad `--theme`/`--mode` pin, and
/// [`CliError::BundleFailures`] when any permutation fails.
pub fn run(args: &BundleArgs<'_>) -> Result<(), CliError> {
    let reader = FsReader;
    let mut loader = DocumentLoader::new(&reader);
    let manifest_path = args.manifest.to_string_lossy().into_owned();
    let manifest = loader.read_manifest(&manifest_path)?;

    check_pin(&manifest, "theme", args.theme)?;
    check_pin(&manifest, "mode", args.mode)?;

    let permutations = enumerate(&manifest).map_err(|e| {
        CliError::Load(LoadError::Shape {
            path: manifest_path.clone(),
            detail: e.to_string(),
        })
    })?;
    let selected: Vec<&Permutation> = permutations
        .iter()
        .filter(|p| matches_pin(p, "theme", args.theme) && matches_pin(p, "mode", args.mode))
        .collect();

    let opts = BundleOptions {
        resolve_external: args.resolve_external,
        resolve_all: args.resolve_refs,
        strict: args.strict,
        format: args.format.into(),
        output: args
            .output
            .map(|p| p.to_string_lossy().into_owned()),
        atomic_writes: true,
    };

    let manifest_dir = parent_dir(&manifest_path);
    let writer = FsWriter;
    let cancel = CancellationToken::new();

    let mut failed = 0usize;
    for permutation in selected.iter().copied() {
        let record =
            bundle_permutation(&manifest_dir, permutation, &mut loader, &writer, &opts, &cancel);
        for warning in &record.warnings {
            eprintln!("warning [{}]: {warning}", record.id);
        }
        match &record.status {
            BundleStatus::Ok => {
                if !args.quiet {
                    println!("{} -> {}", record.id, record.output);
                }
            }
            BundleStatus::Cancelled => {
                eprintln!("cancelled [{}]", record.id);
                failed += 1;
            }
            BundleStatus::Error(e) => {
                eprintln!("failed [{}]: {e}", record.id);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(CliError::BundleFailures {
            failed,
            total: selected.len(),
        });
    }
    Ok(())
}

/// Verifies a pin names a real modifier option before enumeration runs.
fn check_pin(manifest: &Manifest, modifier: &str, pin: Option<&str>) -> Result<(), CliError> {
    let Some(option) = pin else {
        return Ok(());
    };
    let known = manifest
        .modifiers
        .get(modifier)
        .is_some_and(|m| m.options().contains(&option.to_owned()));
    if known {
        Ok(())
    } else {
        Err(CliError::UnknownSelection {
            modifier: modifier.to_owned(),
            option: option.to_owned(),
        })
    }
}

/// Returns `true` when the permutation's selection for `modifier` matches
/// the pin (or there is no pin).
fn matches_pin(permutation: &Permutation, modifier: &str, pin: Option<&str>) -> bool {
    let Some(option) = pin else {
        return true;
    };
    match permutation.selections.get(modifier) {
        Some(Selection::One(selected)) => selected == option,
        Some(Selection::Many(subset)) => subset.len() == 1 && subset[0] == option,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    fn fixture_manifest() -> Manifest {
        serde_json::from_str(
            r#"{
                "sets": [{"values": ["base.json"]}],
                "modifiers": {
                    "theme": {
                        "oneOf": ["light", "dark"],
                        "values": {"light": [], "dark": []}
                    }
                }
            }"#,
        )
        .expect("manifest")
    }

    fn permutations() -> Vec<Permutation> {
        enumerate(&fixture_manifest()).expect("enumerate")
    }

    #[test]
    fn no_pin_matches_everything() {
        assert!(
            permutations()
                .iter()
                .all(|p| matches_pin(p, "theme", None))
        );
    }

    #[test]
    fn pin_filters_by_selection() {
        let perms = permutations();
        let dark: Vec<&Permutation> = perms
            .iter()
            .filter(|p| matches_pin(p, "theme", Some("dark")))
            .collect();
        assert_eq!(dark.len(), 1);
        assert_eq!(dark[0].id, "theme-dark");
    }

    #[test]
    fn pin_on_absent_modifier_matches_nothing() {
        assert!(
            permutations()
                .iter()
                .all(|p| !matches_pin(p, "mode", Some("compact")))
        );
    }

    #[test]
    fn check_pin_rejects_unknown_option() {
        let manifest = fixture_manifest();
        assert!(check_pin(&manifest, "theme", Some("light")).is_ok());
        assert!(check_pin(&manifest, "theme", Some("sepia")).is_err());
        assert!(check_pin(&manifest, "mode", Some("x")).is_err());
        assert!(check_pin(&manifest, "mode", None).is_ok());
    }
}
