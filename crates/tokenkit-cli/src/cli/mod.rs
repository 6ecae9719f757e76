//! Clap CLI definition: root struct, subcommands, and shared argument types.
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output reference dialect for the `bundle` subcommand.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum RefFormat {
    /// Leave references exactly as the sources wrote them (default).
    Preserve,
    /// Rewrite aliases to `$ref` pointer containers.
    Pointer,
    /// Rewrite internal pointer references to `{dotted.path}` aliases.
    Alias,
}

impl From<RefFormat> for tokenkit_core::OutputFormat {
    fn from(f: RefFormat) -> Self {
        match f {
            RefFormat::Preserve => Self::Preserve,
            RefFormat::Pointer => Self::Pointer,
            RefFormat::Alias => Self::Alias,
        }
    }
}

/// The `tokenkit` binary: validate, bundle, and inspect design-token
/// documents driven by a build manifest.
#[derive(Parser)]
#[command(name = "tokenkit", version, about)]
pub struct Cli {
    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging to stderr (respects `RUST_LOG` when set).
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// All top-level subcommands exposed by the `tokenkit` binary.
#[derive(Subcommand)]
pub enum Command {
    /// Validate a token document: structure plus reference integrity.
    Validate {
        /// Path to a token document.
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Treat unresolved references and cycles as errors.
        #[arg(long)]
        strict: bool,
    },

    /// Compose and write every permutation of a manifest.
    Bundle {
        /// Path to the build manifest.
        #[arg(long, value_name = "FILE")]
        manifest: PathBuf,
        /// Pin the `theme` modifier to one option.
        #[arg(long, value_name = "NAME")]
        theme: Option<String>,
        /// Pin the `mode` modifier to one option.
        #[arg(long, value_name = "NAME")]
        mode: Option<String>,
        /// Output reference dialect.
        #[arg(long, default_value = "preserve", value_enum)]
        format: RefFormat,
        /// Inline every reference (internal and alias included).
        #[arg(long)]
        resolve_refs: bool,
        /// Run an extra external-resolution pass over the merged document.
        #[arg(long)]
        resolve_external: bool,
        /// Output directory (defaults to the manifest's directory).
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Fail permutations on unresolved references and cycles.
        #[arg(long)]
        strict: bool,
    },

    /// Emit the annotated reference graph for each permutation as JSON.
    Ast {
        /// Path to the build manifest.
        #[arg(long, value_name = "FILE")]
        manifest: PathBuf,
        /// Write the graph JSON here instead of stdout.
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}
