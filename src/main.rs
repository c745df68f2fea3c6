//! Firebug test-run supervisor CLI

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use fbtest_runner::commands::Commands;
use fbtest_runner::common::logging;
use fbtest_runner::runner::{self, RunConfig};
use fbtest_runner::{batch, Error};

#[derive(Parser)]
#[command(name = "fbtest-runner", about = "Supervises Firebug/FBTest browser test runs")]
#[command(version, long_about = None)]
struct Cli {
    /// Path to the runner's own log file (default: stderr)
    #[arg(long, global = true)]
    log: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _guard = logging::init(cli.log.as_deref(), cli.debug);

    // Ctrl-C requests an orderly stop: the poll loops notice the token,
    // the browser is stopped and the artifacts removed before exiting.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping run");
                cancel.cancel();
            }
        });
    }

    let code = match cli.command {
        Commands::Run {
            binary,
            profile,
            serverpath,
            version,
            testlist,
            discovery_window,
            idle_timeout,
        } => {
            let config = RunConfig {
                binary,
                profile,
                serverpath,
                version,
                testlist,
                tick: Duration::from_secs(1),
                discovery_ticks: discovery_window,
                idle_timeout_ticks: idle_timeout,
                env: Vec::new(),
            };
            match runner::run(&config, &cancel).await {
                Ok(verdict) => runner::exit_code(&verdict),
                Err(Error::Cancelled) => 1,
                Err(e) => {
                    eprintln!("Error: {e}");
                    1
                }
            }
        }

        Commands::Batch {
            build_root,
            serverpath,
            version,
            discovery_window,
            idle_timeout,
        } => {
            let config = batch::BatchConfig {
                build_root,
                serverpath: serverpath.clone(),
                version: version.clone(),
                run: RunConfig {
                    serverpath,
                    version,
                    discovery_ticks: discovery_window,
                    idle_timeout_ticks: idle_timeout,
                    ..RunConfig::default()
                },
            };
            match batch::run(&config, &cancel).await {
                Ok(0) => 0,
                Ok(failures) => {
                    eprintln!("{} run(s) did not complete", failures);
                    1
                }
                Err(Error::Cancelled) => 1,
                Err(e) => {
                    eprintln!("Error: {e}");
                    1
                }
            }
        }
    };

    std::process::exit(code);
}
