//! Orchestration of one supervised test run
//!
//! Sequence: resolve the profile, fetch the test-bot config, download the
//! firebug and fbtest extensions, launch the browser, then watch the
//! harness log until it either announces completion or goes silent.
//! Cleanup (stop the browser, delete the downloaded artifacts) runs exactly
//! once on every exit path and is never allowed to mask the verdict.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::common::{Error, Result};
use crate::config::TestBotConfig;
use crate::download;
use crate::profile;
use crate::supervisor::detector::CompletionDetector;
use crate::supervisor::process::{self, BrowserHandle, LaunchSpec};
use crate::supervisor::tailer::{self, LogTailer, TailEvent};
use crate::supervisor::{Detection, Verdict};

/// Default server hosting the tests and the test-bot config
pub const DEFAULT_SERVERPATH: &str = "https://getfirebug.com/";

/// Default Firebug version to run
pub const DEFAULT_VERSION: &str = "1.7";

/// Ticks to wait for the harness log file to first appear
pub const DEFAULT_DISCOVERY_TICKS: u32 = 60;

/// Consecutive silent ticks before a crash is suspected. Kept separate
/// from the discovery window: one guards "file appears", the other "file
/// advances".
pub const DEFAULT_IDLE_TIMEOUT_TICKS: u32 = 60;

/// Working-directory names of the downloaded artifacts. Fixed, not
/// per-run-unique, which is why runs must never overlap.
pub const FIREBUG_XPI_FILE: &str = "firebug.xpi";
pub const FBTEST_XPI_FILE: &str = "fbtest.xpi";

/// Immutable inputs for one supervised run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Browser binary; `None` means take `firefox` from PATH
    pub binary: Option<PathBuf>,
    /// Profile to run against; missing or `None` means a fresh temp profile
    pub profile: Option<PathBuf>,
    pub serverpath: String,
    pub version: String,
    /// Explicit test list; `None` means the TEST_LIST from the config
    pub testlist: Option<String>,
    /// Duration of one polling tick
    pub tick: Duration,
    pub discovery_ticks: u32,
    pub idle_timeout_ticks: u32,
    /// Extra environment for the browser, merged over the required overrides
    pub env: Vec<(String, String)>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            binary: None,
            profile: None,
            serverpath: DEFAULT_SERVERPATH.to_string(),
            version: DEFAULT_VERSION.to_string(),
            testlist: None,
            tick: Duration::from_secs(1),
            discovery_ticks: DEFAULT_DISCOVERY_TICKS,
            idle_timeout_ticks: DEFAULT_IDLE_TIMEOUT_TICKS,
            env: Vec::new(),
        }
    }
}

/// Process exit status for a verdict: 0 only for a completed suite
pub fn exit_code(verdict: &Verdict) -> i32 {
    if verdict.is_success() {
        0
    } else {
        1
    }
}

/// Run one supervised test pass.
///
/// Returns the verdict for every expected outcome; `Err` is reserved for
/// cancellation and truly unexpected failures. Cleanup runs exactly once
/// in every case.
pub async fn run(config: &RunConfig, cancel: &CancellationToken) -> Result<Verdict> {
    let mut browser = BrowserHandle::new();
    // The profile outlives the browser: a temporary profile must not be
    // deleted while the process still runs.
    let mut profile = None;
    let result = run_supervised(config, cancel, &mut browser, &mut profile).await;

    report(&result);
    browser.stop().await;
    cleanup_artifacts();
    drop(profile);

    result
}

async fn run_supervised(
    config: &RunConfig,
    cancel: &CancellationToken,
    browser: &mut BrowserHandle,
    profile_slot: &mut Option<profile::Profile>,
) -> Result<Verdict> {
    let binary = match resolve_binary(config) {
        Ok(binary) => binary,
        Err(e) => return Ok(Verdict::LaunchFailed(e.to_string())),
    };

    let profile = profile_slot.insert(profile::prepare(config.profile.as_deref())?);
    tailer::rotate_old_logs(profile.path())?;

    let client = reqwest::Client::new();

    // Config artifact, then the two extension archives
    let prepared = async {
        let text = download::fetch_config(&client, &config.serverpath).await?;
        let bot = TestBotConfig::parse(&text);

        let testlist = match &config.testlist {
            Some(list) => list.clone(),
            None => bot.test_list(&config.version)?.to_string(),
        };

        tracing::debug!("Downloading firebug and fbtest extensions from server");
        download::download_file(
            &client,
            bot.firebug_xpi(&config.version)?,
            Path::new(FIREBUG_XPI_FILE),
        )
        .await?;
        download::download_file(
            &client,
            bot.fbtest_xpi(&config.version)?,
            Path::new(FBTEST_XPI_FILE),
        )
        .await?;
        Ok::<String, Error>(testlist)
    }
    .await;

    let testlist = match prepared {
        Ok(testlist) => testlist,
        Err(e) => {
            tracing::error!("Extensions could not be downloaded: {}", e);
            return Ok(Verdict::LaunchFailed(e.to_string()));
        }
    };

    tracing::info!("Starting Firebug tests");
    tracing::debug!("Installing extensions into profile");
    if let Err(e) = profile::install_extensions(
        profile.path(),
        &[PathBuf::from(FIREBUG_XPI_FILE), PathBuf::from(FBTEST_XPI_FILE)],
    ) {
        tracing::error!("Extensions could not be installed: {}", e);
        return Ok(Verdict::LaunchFailed(e.to_string()));
    }

    process::disable_compatibility_check(&binary, profile.path());

    let spec = LaunchSpec {
        binary: &binary,
        profile: profile.path(),
        testlist: &testlist,
        env: &config.env,
    };
    if let Err(e) = browser.launch(&spec) {
        tracing::error!("{}", e);
        return Ok(Verdict::LaunchFailed(e.to_string()));
    }

    let verdict = supervise(
        &profile.path().join(tailer::LOG_DIR),
        config.discovery_ticks,
        config.idle_timeout_ticks,
        config.tick,
        cancel,
    )
    .await?;

    if matches!(verdict, Verdict::CrashSuspected { .. }) {
        browser.note_crash_suspected();
    }
    Ok(verdict)
}

/// Watch the harness log until the run is classified.
///
/// Discovery and idling are bounded by independent tick budgets; the
/// cancellation token is honored at every tick of both loops. Each harness
/// line is echoed to stdout as it arrives.
pub async fn supervise(
    log_dir: &Path,
    discovery_ticks: u32,
    idle_timeout_ticks: u32,
    tick: Duration,
    cancel: &CancellationToken,
) -> Result<Verdict> {
    let Some(mut tailer) = LogTailer::discover(log_dir, discovery_ticks, tick, cancel).await?
    else {
        return Ok(Verdict::LogNotFound);
    };

    let mut detector = CompletionDetector::new(idle_timeout_ticks);
    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let event = tailer.next_event().await;
        if let TailEvent::Line(line) = &event {
            println!("{}", line);
        }

        match detector.observe(&event) {
            Detection::Completed => return Ok(Verdict::Completed),
            Detection::IdleTimeout => {
                return Ok(Verdict::CrashSuspected {
                    test: detector.offending_test(),
                })
            }
            Detection::Continue => {}
        }

        if event == TailEvent::Idle {
            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(tick) => {}
            }
        }
    }
}

fn resolve_binary(config: &RunConfig) -> Result<PathBuf> {
    match &config.binary {
        Some(binary) => Ok(binary.clone()),
        None => which::which("firefox")
            .map_err(|_| Error::Launch("No binary given and no 'firefox' on PATH".into())),
    }
}

/// One explicit line per terminal outcome, so batch tooling can grep
/// results without parsing runner internals.
fn report(result: &Result<Verdict>) {
    match result {
        Ok(Verdict::Completed) => {
            tracing::debug!("Exiting - Status successful");
        }
        Ok(Verdict::CrashSuspected { test }) => {
            println!("FIREBUG TEST-UNEXPECTED-FAIL | {} | Possible Firefox crash detected", test);
            tracing::warn!("Possible crash detected - test run aborted");
        }
        Ok(Verdict::LogNotFound) => {
            tracing::error!("Could not find the log file in the profile");
        }
        Ok(Verdict::LaunchFailed(reason)) => {
            tracing::error!("Test run could not be launched: {}", reason);
        }
        Err(e) => {
            tracing::error!("Test run aborted: {}", e);
        }
    }
}

/// Remove the temporarily downloaded files. Best-effort: cleanup failures
/// are logged and never override the run's verdict.
fn cleanup_artifacts() {
    for name in [FIREBUG_XPI_FILE, FBTEST_XPI_FILE, crate::config::CONFIG_FILE] {
        let path = Path::new(name);
        if path.exists() {
            tracing::debug!("Removing {}", name);
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!("Could not clean up temporary file '{}': {}", name, e);
            }
        }
    }
}
