//! Supervision of a single browser test run
//!
//! The browser process and the harness only communicate with the runner
//! through a log file inside the profile. Supervision is therefore a
//! cooperative polling loop: launch the process, wait for the log to
//! appear, read it incrementally, and classify the run from what the log
//! does (or stops doing).

pub mod detector;
pub mod process;
pub mod tailer;

pub use detector::{CompletionDetector, Detection};
pub use process::{BrowserHandle, LaunchSpec, ProcessState};
pub use tailer::{LogTailer, TailEvent};

/// Final classification of a supervised run.
///
/// Produced exactly once per run. `CrashSuspected` is a heuristic: the only
/// signal available is silence on the log, which cannot distinguish a
/// browser crash from a hang in the harness or in the test itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The harness wrote its completion marker
    Completed,
    /// The log went silent before completion; `test` is the best-effort
    /// attribution of the offending test
    CrashSuspected { test: String },
    /// No log file appeared within the discovery window
    LogNotFound,
    /// The run never got as far as a supervised browser
    LaunchFailed(String),
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Completed)
    }
}
