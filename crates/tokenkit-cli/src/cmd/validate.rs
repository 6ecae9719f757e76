/// `tokenkit validate` — structural and reference-integrity validation of
/// one token document.
///
/// Diagnostics go to stderr, one per line, followed by a summary. The data
/// channel (stdout) stays empty so the command pipes cleanly.
use std::path::Path;

use tokenkit_core::{
    BasicStructuralValidator, DocumentLoader, FsReader, ValidationOptions, validate_document,
};

use crate::error::CliError;

/// Runs the validate subcommand.
///
/// # Errors
///
/// [`CliError::Load`] when the document cannot be read or parsed;
/// [`CliError::ValidationErrors`] when error-severity findings exist.
pub fn run(file: &Path, strict: bool, quiet: bool) -> Result<(), CliError> {
    let reader = FsReader;
    let mut loader = DocumentLoader::new(&reader);
    let document = loader.read_document(&file.to_string_lossy())?;

    let report = validate_document(
        &document,
        &BasicStructuralValidator,
        ValidationOptions { strict },
    );

    for issue in report.errors.iter().chain(report.warnings.iter()) {
        eprintln!("{issue}");
    }

    if !quiet {
        eprintln!(
            "{} error(s), {} warning(s); {} tokens, {} groups, {} references",
            report.errors.len(),
            report.warnings.len(),
            report.stats.token_count,
            report.stats.group_count,
            report.stats.reference_count,
        );
    }

    if report.valid {
        Ok(())
    } else {
        Err(CliError::ValidationErrors {
            count: report.errors.len(),
        })
    }
}
