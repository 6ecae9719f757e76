//! Subcommand handlers. Each module exposes a `run` function that returns
//! `Result<(), CliError>`; `main` maps the error to stderr + exit code.
pub mod ast;
pub mod bundle;
pub mod validate;
