// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Terminal output for the CLI.
//!
//! Structured logs go through `tracing`; the macros here print short status
//! lines to stderr so stdout stays free for JSON results.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::EnvFilter;

/// Global verbosity flag.
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set the global verbosity flag.
pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

/// Check if verbose output is enabled.
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Build the log filter: `debug` when verbose, else `RUST_LOG` or `info`.
fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Install the global `tracing` subscriber. Later calls are ignored.
pub fn init_tracing(verbose: bool) {
    set_verbose(verbose);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .try_init();
}

/// Macro for error messages.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        eprintln!("{} {}", "Error:".red().bold(), format!($($arg)*));
    }}
}

/// Macro for success messages.
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        eprintln!("{} {}", "✅".green(), format!($($arg)*));
    }}
}

/// Macro for section headers.
#[macro_export]
macro_rules! section {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        if $crate::cli::logging::is_verbose() {
            eprintln!();
            eprintln!("{}", format!($($arg)*).cyan().bold());
        }
    }}
}
