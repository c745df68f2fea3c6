//! Logging and tracing configuration
//!
//! Diagnostics go through `tracing`; harness log lines and the
//! machine-parseable failure line are printed straight to stdout so batch
//! tooling can grep them without a tracing prefix.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Initialize tracing for the runner.
///
/// With no log file, diagnostics go to stderr. With `log_file` set, they go
/// to that file instead (ANSI off, non-blocking writer). `RUST_LOG`
/// overrides the default filter; `debug` lowers the default from info to
/// debug.
///
/// The returned guard must be held for the life of the process, otherwise
/// buffered file output is lost.
pub fn init(log_file: Option<&Path>, debug: bool) -> Option<WorkerGuard> {
    let default = if debug {
        "fbtest_runner=debug,info"
    } else {
        "fbtest_runner=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    if let Some(path) = log_file {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                let _ = std::fs::create_dir_all(dir);
            }
        }

        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                let (writer, guard) = tracing_appender::non_blocking(file);
                tracing_subscriber::registry()
                    .with(filter)
                    .with(
                        fmt::layer()
                            .with_writer(writer)
                            .with_ansi(false)
                            .with_target(true),
                    )
                    .init();
                return Some(guard);
            }
            Err(e) => {
                eprintln!("Warning: Could not open log file '{}': {}", path.display(), e);
            }
        }
    }

    // Fallback: stderr only
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .init();

    None
}
