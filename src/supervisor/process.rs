//! Browser process lifecycle
//!
//! Launches the browser with the harness arguments and the environment
//! overrides that keep it from ever blocking on user interaction, and owns
//! the child handle until cleanup stops it.

use std::path::Path;
use std::process::Stdio;

use tokio::process::{Child, Command};

use crate::common::{Error, Result};
use crate::config::IniDoc;
use crate::profile;

/// Environment overrides that must always be set on the browser.
///
/// `MOZ_CRASHREPORTER_NO_REPORT` disables the crash reporter UI;
/// `XPC_DEBUG_WARN` downgrades assertion dialogs to warnings. Without
/// these a debug build can sit on a modal dialog forever.
pub const REQUIRED_ENV: &[(&str, &str)] = &[
    ("MOZ_CRASHREPORTER_NO_REPORT", "true"),
    ("XPC_DEBUG_WARN", "warn"),
];

/// Lifecycle of the supervised browser.
///
/// `Crashed` is never directly observed; it is inferred by the orchestrator
/// when the run idles out with the process status unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    NotStarted,
    Launching,
    Running,
    Stopped,
    Crashed,
}

/// What to launch: binary, profile, test list, and extra environment
#[derive(Debug)]
pub struct LaunchSpec<'a> {
    pub binary: &'a Path,
    pub profile: &'a Path,
    pub testlist: &'a str,
    pub env: &'a [(String, String)],
}

/// Handle to the launched browser, owned exclusively by the supervisor
#[derive(Debug)]
pub struct BrowserHandle {
    child: Option<Child>,
    state: ProcessState,
}

impl Default for BrowserHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserHandle {
    pub fn new() -> Self {
        Self {
            child: None,
            state: ProcessState::NotStarted,
        }
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Launch the browser asynchronously.
    ///
    /// Returns as soon as the process is spawned; log discovery runs
    /// concurrently with browser startup. The child is killed on drop so a
    /// panicking run cannot leak a browser.
    pub fn launch(&mut self, spec: &LaunchSpec<'_>) -> Result<()> {
        self.state = ProcessState::Launching;

        tracing::debug!(
            "Running '{}' with cmdargs '-runFBTests {}'",
            spec.binary.display(),
            spec.testlist
        );

        let mut cmd = Command::new(spec.binary);
        cmd.arg("-no-remote")
            .arg("-profile")
            .arg(spec.profile)
            .arg("-runFBTests")
            .arg(spec.testlist)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        for (key, value) in REQUIRED_ENV {
            cmd.env(key, value);
        }
        for (key, value) in spec.env {
            cmd.env(key, value);
        }

        let child = cmd.spawn().map_err(|e| {
            Error::Launch(format!("Failed to start '{}': {}", spec.binary.display(), e))
        })?;
        self.child = Some(child);
        self.state = ProcessState::Running;
        Ok(())
    }

    /// Record that the idle timeout fired with the process status unknown
    pub fn note_crash_suspected(&mut self) {
        self.state = ProcessState::Crashed;
    }

    /// Unconditionally terminate the browser. Idempotent: safe to call
    /// after the process already exited, and safe to call twice.
    pub async fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            tracing::debug!("Stopping browser");
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
        if self.state != ProcessState::Crashed {
            self.state = ProcessState::Stopped;
        }
    }
}

/// Disable the extension compatibility check, which could otherwise prompt
/// the user on startup. Best-effort: a browser we cannot read the version
/// of still gets supervised, just with the prompt risk logged.
pub fn disable_compatibility_check(binary: &Path, profile: &Path) {
    if let Err(e) = write_compatibility_pref(binary, profile) {
        tracing::warn!("Could not disable compatibility check: {}", e);
    }
}

fn write_compatibility_pref(binary: &Path, profile: &Path) -> Result<()> {
    let app_dir = binary
        .parent()
        .ok_or_else(|| Error::Config("Binary path has no parent directory".into()))?;
    let ini = std::fs::read_to_string(app_dir.join("application.ini"))?;
    let version = IniDoc::parse(&ini)
        .get("App", "Version")
        .ok_or_else(|| Error::Config("No App/Version in application.ini".into()))?
        .to_string();
    let version = truncate_version(&version);
    profile::append_pref(
        profile,
        &format!("extensions.checkCompatibility.{}", version),
        "false",
    )
}

/// Reduce a full application version to the form the compatibility pref is
/// keyed by: '3.6' or '4.0b', never the whole string.
pub fn truncate_version(version: &str) -> &str {
    // Byte 3 being ASCII 'b' guarantees ..4 is a char boundary; the ..3
    // slice has no such guarantee, so fall back to the whole string rather
    // than panic on a malformed application.ini.
    if version.len() >= 4 && version.as_bytes()[3] == b'b' {
        &version[..4]
    } else {
        version.get(..3).unwrap_or(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_release_version() {
        assert_eq!(truncate_version("3.6.13"), "3.6");
    }

    #[test]
    fn test_truncate_beta_version() {
        assert_eq!(truncate_version("4.0b7"), "4.0b");
    }

    #[test]
    fn test_truncate_short_version_unchanged() {
        assert_eq!(truncate_version("4"), "4");
    }

    #[test]
    fn test_truncate_multibyte_version_does_not_panic() {
        // Byte index 3 falls inside the two-byte character
        assert_eq!(truncate_version("3.β7"), "3.β7");
        assert_eq!(truncate_version("β"), "β");
    }

    #[tokio::test]
    async fn test_launch_failure_for_missing_binary() {
        let dir = tempfile::TempDir::new().unwrap();
        let spec = LaunchSpec {
            binary: Path::new("/nonexistent/firefox"),
            profile: dir.path(),
            testlist: "firebug1.7.html",
            env: &[],
        };
        let mut handle = BrowserHandle::new();
        assert_eq!(handle.state(), ProcessState::NotStarted);
        let err = handle.launch(&spec).unwrap_err();
        assert!(matches!(err, Error::Launch(_)));
        assert_eq!(handle.state(), ProcessState::Launching);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        // Any spawnable binary will do; sh exits immediately on the
        // unrecognized arguments, which is exactly the already-exited case
        // stop has to tolerate.
        let spec = LaunchSpec {
            binary: Path::new("/bin/sh"),
            profile: dir.path(),
            testlist: "firebug1.7.html",
            env: &[],
        };
        let mut handle = BrowserHandle::new();
        handle.launch(&spec).unwrap();
        assert_eq!(handle.state(), ProcessState::Running);

        handle.stop().await;
        assert_eq!(handle.state(), ProcessState::Stopped);
        handle.stop().await;
        assert_eq!(handle.state(), ProcessState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_before_launch_is_safe() {
        let mut handle = BrowserHandle::new();
        handle.stop().await;
        assert_eq!(handle.state(), ProcessState::Stopped);
    }

    #[tokio::test]
    async fn test_crash_suspicion_survives_stop() {
        let dir = tempfile::TempDir::new().unwrap();
        let spec = LaunchSpec {
            binary: Path::new("/bin/sh"),
            profile: dir.path(),
            testlist: "firebug1.7.html",
            env: &[],
        };
        let mut handle = BrowserHandle::new();
        handle.launch(&spec).unwrap();
        handle.note_crash_suspected();
        handle.stop().await;
        assert_eq!(handle.state(), ProcessState::Crashed);
    }
}
