pub mod cli;
pub mod cmd;
pub mod error;

pub use cli::{Cli, Command, RefFormat};

use clap::Parser;

fn main() {
    #[cfg(unix)]
    install_sigpipe_default();

    let cli = Cli::parse();

    if cli.verbose {
        init_tracing();
    }

    let result = dispatch(&cli);

    if let Err(e) = result {
        eprintln!("{}", e.message());
        std::process::exit(e.exit_code());
    }
}

/// Dispatches the parsed CLI arguments to the appropriate command handler.
///
/// Returns `Ok(())` on success or a [`error::CliError`] on failure. The
/// caller is responsible for printing the error message and exiting with
/// the appropriate exit code.
fn dispatch(cli: &Cli) -> Result<(), error::CliError> {
    match &cli.command {
        Command::Validate { file, strict } => cmd::validate::run(file, *strict, cli.quiet),

        Command::Bundle {
            manifest,
            theme,
            mode,
            format,
            resolve_refs,
            resolve_external,
            output,
            strict,
        } => cmd::bundle::run(&cmd::bundle::BundleArgs {
            manifest,
            theme: theme.as_deref(),
            mode: mode.as_deref(),
            format: *format,
            resolve_refs: *resolve_refs,
            resolve_external: *resolve_external,
            output: output.as_deref(),
            strict: *strict,
            quiet: cli.quiet,
        }),

        Command::Ast { manifest, output } => cmd::ast::run(manifest, output.as_deref()),
    }
}

/// Debug logging to stderr; `RUST_LOG` overrides the default filter.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tokenkit_core=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Resets `SIGPIPE` to its default disposition (`SIG_DFL`).
///
/// Rust's runtime ignores `SIGPIPE` by default, which causes programs that
/// write to a closed pipe (e.g. `tokenkit ast … | head`) to receive an
/// `Err(BrokenPipe)` from a write call rather than being terminated
/// silently. Restoring the default disposition lets the kernel terminate
/// the process the way standard Unix tools do.
#[cfg(unix)]
fn install_sigpipe_default() {
    // SAFETY: signal() is safe to call during single-threaded program
    // initialization before any other threads are spawned. SIG_DFL is a
    // valid handler for SIGPIPE. The return value (previous handler) is
    // discarded.
    //
    // The workspace denies `unsafe_code` globally, but this is the minimal
    // unavoidable use of libc required for SIGPIPE handling on Unix. There
    // is no safe Rust equivalent in the standard library.
    #[allow(unsafe_code)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
}
