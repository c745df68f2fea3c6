//! Batch driver: one supervised run per configured Firefox build
//!
//! The server config maps a Firebug release to the Firefox versions it
//! should be tested against. Each version resolves to a Gecko branch build
//! under a local build root. Runs are strictly sequential: the downloaded
//! artifact names are fixed, so overlapping runs would corrupt each other.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::common::Result;
use crate::config::TestBotConfig;
use crate::download;
use crate::runner::{self, RunConfig};

/// Firefox version to Gecko branch, as laid out under the build root
const GECKO_BRANCHES: &[(&str, &str)] = &[
    ("3.5", "1.9.1"),
    ("3.6", "1.9.2"),
    ("3.7", "1.9.3"),
];

/// Inputs for a batch of supervised runs
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Directory holding one build tree per Gecko branch
    pub build_root: PathBuf,
    pub serverpath: String,
    pub version: String,
    pub run: RunConfig,
}

/// Branch identifier for a Firefox version, if it is one we have builds for
pub fn gecko_branch(firefox_version: &str) -> Option<&'static str> {
    GECKO_BRANCHES
        .iter()
        .find(|(version, _)| *version == firefox_version)
        .map(|(_, branch)| *branch)
}

/// Path of the debug build binary for a branch under the build root
pub fn build_binary_path(build_root: &Path, branch: &str) -> PathBuf {
    build_root
        .join(branch)
        .join("mozilla/firefox-debug/dist/bin/firefox")
}

/// Supervise one run per configured Firefox build, sequentially.
///
/// Returns the number of runs that did not complete.
pub async fn run(config: &BatchConfig, cancel: &CancellationToken) -> Result<usize> {
    let client = reqwest::Client::new();
    let text = download::fetch_config(&client, &config.serverpath).await?;
    let versions = TestBotConfig::parse(&text).firefox_versions(&config.version)?;

    let mut failures = 0;
    for firefox_version in &versions {
        let Some(branch) = gecko_branch(firefox_version) else {
            tracing::warn!("No known Gecko branch for Firefox {}", firefox_version);
            failures += 1;
            continue;
        };

        let run_config = RunConfig {
            binary: Some(build_binary_path(&config.build_root, branch)),
            serverpath: config.serverpath.clone(),
            version: config.version.clone(),
            ..config.run.clone()
        };

        tracing::info!("Supervising run against Firefox {} ({})", firefox_version, branch);
        let verdict = runner::run(&run_config, cancel).await?;
        if !verdict.is_success() {
            failures += 1;
        }
    }

    Ok(failures)
}
