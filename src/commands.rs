//! CLI command definitions

use clap::Subcommand;
use std::path::PathBuf;

use crate::runner;

#[derive(Subcommand)]
pub enum Commands {
    /// Run one supervised test pass against a browser binary
    Run {
        /// Firefox binary path (default: first `firefox` on PATH)
        #[arg(long = "appname")]
        binary: Option<PathBuf>,

        /// The profile to use when running Firefox
        #[arg(long = "profile-path")]
        profile: Option<PathBuf>,

        /// The http server containing the Firebug tests
        #[arg(short, long, default_value = runner::DEFAULT_SERVERPATH)]
        serverpath: String,

        /// The Firebug version to run
        #[arg(short = 'v', long = "version", default_value = runner::DEFAULT_VERSION)]
        version: String,

        /// Name of the testlist to use (default: the TEST_LIST from the
        /// server config)
        #[arg(short, long)]
        testlist: Option<String>,

        /// Seconds to wait for the harness log file to appear
        #[arg(long, default_value_t = runner::DEFAULT_DISCOVERY_TICKS)]
        discovery_window: u32,

        /// Seconds the log may stay silent before a crash is suspected
        #[arg(long, default_value_t = runner::DEFAULT_IDLE_TIMEOUT_TICKS)]
        idle_timeout: u32,
    },

    /// Supervise one run per Firefox build listed in the server config
    Batch {
        /// Directory holding one Gecko build tree per branch
        #[arg(long)]
        build_root: PathBuf,

        /// The http server containing the Firebug tests
        #[arg(short, long, default_value = runner::DEFAULT_SERVERPATH)]
        serverpath: String,

        /// The Firebug version to run
        #[arg(short = 'v', long = "version", default_value = runner::DEFAULT_VERSION)]
        version: String,

        /// Seconds to wait for the harness log file to appear
        #[arg(long, default_value_t = runner::DEFAULT_DISCOVERY_TICKS)]
        discovery_window: u32,

        /// Seconds the log may stay silent before a crash is suspected
        #[arg(long, default_value_t = runner::DEFAULT_IDLE_TIMEOUT_TICKS)]
        idle_timeout: u32,
    },
}
