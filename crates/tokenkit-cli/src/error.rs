/// CLI error types.
///
/// [`CliError`] is the top-level error type for the `tokenkit` binary.
/// Every failure exits with code 1; [`CliError::message`] returns the
/// string printed to stderr first.
use std::fmt;

use tokenkit_core::LoadError;

// ---------------------------------------------------------------------------
// CliError
// ---------------------------------------------------------------------------

/// All error conditions the `tokenkit` CLI can produce.
#[derive(Debug)]
pub enum CliError {
    /// A document or manifest could not be loaded (io, parse, or shape).
    Load(LoadError),

    /// Validation found one or more errors.
    ///
    /// The diagnostics have already been printed; this variant exists so
    /// `main` can exit non-zero cleanly.
    ValidationErrors {
        /// Number of error findings.
        count: usize,
    },

    /// One or more permutations failed to bundle.
    BundleFailures {
        /// Number of failed permutations.
        failed: usize,
        /// Total number of permutations attempted.
        total: usize,
    },

    /// A permutation failed to compose while building its graph.
    Compose {
        /// Permutation id.
        id: String,
        /// What went wrong.
        detail: String,
    },

    /// A `--theme`/`--mode` pin referenced an unknown modifier or option.
    UnknownSelection {
        /// The modifier name.
        modifier: String,
        /// The requested option.
        option: String,
    },

    /// Output could not be written.
    Write {
        /// The path that failed.
        path: String,
        /// The underlying error message.
        detail: String,
    },
}

impl CliError {
    /// Returns the process exit code for this error. The CLI contract is
    /// exit 0 on success and 1 on any error.
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Returns a human-readable error message suitable for stderr.
    pub fn message(&self) -> String {
        match self {
            Self::Load(e) => format!("error: {e}"),
            Self::ValidationErrors { count } => {
                format!("error: validation failed with {count} error(s)")
            }
            Self::BundleFailures { failed, total } => {
                format!("error: {failed} of {total} permutation(s) failed")
            }
            Self::Compose { id, detail } => {
                format!("error: permutation {id:?} failed to compose: {detail}")
            }
            Self::UnknownSelection { modifier, option } => {
                format!("error: modifier {modifier:?} has no option {option:?}")
            }
            Self::Write { path, detail } => {
                format!("error: cannot write {path}: {detail}")
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for CliError {}

impl From<LoadError> for CliError {
    fn from(e: LoadError) -> Self {
        Self::Load(e)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn every_variant_is_exit_1() {
        let errors = [
            CliError::Load(LoadError::Io {
                path: "x.json".to_owned(),
                detail: "gone".to_owned(),
            }),
            CliError::ValidationErrors { count: 2 },
            CliError::BundleFailures {
                failed: 1,
                total: 4,
            },
            CliError::Compose {
                id: "theme-dark".to_owned(),
                detail: "load failed".to_owned(),
            },
            CliError::UnknownSelection {
                modifier: "theme".to_owned(),
                option: "sepia".to_owned(),
            },
            CliError::Write {
                path: "out.json".to_owned(),
                detail: "disk full".to_owned(),
            },
        ];
        for e in errors {
            assert_eq!(e.exit_code(), 1, "{e}");
        }
    }

    #[test]
    fn load_message_names_the_file() {
        let e = CliError::Load(LoadError::Parse {
            path: "broken.json".to_owned(),
            detail: "expected value at line 1".to_owned(),
        });
        assert!(e.message().contains("broken.json"));
    }

    #[test]
    fn bundle_failures_message_has_counts() {
        let e = CliError::BundleFailures {
            failed: 3,
            total: 8,
        };
        let msg = e.message();
        assert!(msg.contains('3') && msg.contains('8'), "{msg}");
    }

    #[test]
    fn unknown_selection_names_modifier_and_option() {
        let e = CliError::UnknownSelection {
            modifier: "theme".to_owned(),
            option: "sepia".to_owned(),
        };
        let msg = e.message();
        assert!(msg.contains("theme") && msg.contains("sepia"), "{msg}");
    }

    #[test]
    fn display_matches_message() {
        let e = CliError::ValidationErrors { count: 1 };
        assert_eq!(format!("{e}"), e.message());
    }
}
