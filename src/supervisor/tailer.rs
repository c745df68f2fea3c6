//! Harness log discovery and incremental tailing
//!
//! The fbtest harness creates exactly one log file under the profile's log
//! directory some time after browser startup. The tailer archives leftovers
//! from earlier runs, polls for the new file to appear, then reads it
//! incrementally, yielding complete lines as they are written.

use std::fs;
use std::path::Path;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::common::{Error, Result};

/// Profile-relative directory the harness writes its log into
pub const LOG_DIR: &str = "firebug/fbtest/logs";

/// Profile-relative directory logs from previous runs are archived into
pub const ARCHIVE_DIR: &str = "firebug/fbtest/logs_old";

/// One observation of the tailed log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailEvent {
    /// A complete line, without its trailing newline
    Line(String),
    /// No new complete line was available
    Idle,
}

/// Move any log files left over from a previous run into the archive
/// directory, so a stale log is never mistaken for this run's output.
pub fn rotate_old_logs(profile: &Path) -> Result<()> {
    let logs = profile.join(LOG_DIR);
    if !logs.is_dir() {
        return Ok(());
    }

    let archive = profile.join(ARCHIVE_DIR);
    fs::create_dir_all(&archive)?;

    for entry in fs::read_dir(&logs)? {
        let entry = entry?;
        tracing::debug!("Archiving old log '{}'", entry.path().display());
        fs::rename(entry.path(), archive.join(entry.file_name()))?;
    }
    Ok(())
}

/// Incremental reader over the discovered harness log.
///
/// Owns the only open handle to the log for the duration of supervision.
#[derive(Debug)]
pub struct LogTailer {
    reader: BufReader<File>,
    partial: String,
}

impl LogTailer {
    /// Poll `log_dir` for the harness log to appear, up to `ticks` polls one
    /// `tick` apart. The directory not existing yet is normal during the
    /// window. Returns `None` when the window is exhausted.
    pub async fn discover(
        log_dir: &Path,
        ticks: u32,
        tick: Duration,
        cancel: &CancellationToken,
    ) -> Result<Option<Self>> {
        for _ in 0..ticks {
            if let Some(path) = first_file(log_dir) {
                tracing::debug!("Found harness log '{}'", path.display());
                let file = File::open(&path).await?;
                return Ok(Some(Self {
                    reader: BufReader::new(file),
                    partial: String::new(),
                }));
            }
            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(tick) => {}
            }
        }
        Ok(None)
    }

    /// Read the next complete line, or report that nothing new is there.
    ///
    /// A trailing line without its newline yet is buffered until the rest
    /// arrives. Read errors count as silence rather than aborting: the
    /// harness owns the file and may truncate or remove it mid-run.
    pub async fn next_event(&mut self) -> TailEvent {
        let mut chunk = String::new();
        match self.reader.read_line(&mut chunk).await {
            Ok(0) => TailEvent::Idle,
            Ok(_) => {
                self.partial.push_str(&chunk);
                if self.partial.ends_with('\n') {
                    let line = std::mem::take(&mut self.partial);
                    TailEvent::Line(line.trim_end_matches(['\r', '\n']).to_string())
                } else {
                    TailEvent::Idle
                }
            }
            Err(e) => {
                tracing::debug!("Log read failed, treating as silence: {}", e);
                TailEvent::Idle
            }
        }
    }
}

fn first_file(dir: &Path) -> Option<std::path::PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() {
            return Some(path);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn fast() -> Duration {
        Duration::from_millis(5)
    }

    #[test]
    fn test_rotate_moves_everything_to_archive() {
        let profile = TempDir::new().unwrap();
        let logs = profile.path().join(LOG_DIR);
        fs::create_dir_all(&logs).unwrap();
        fs::write(logs.join("run1.log"), "old").unwrap();
        fs::write(logs.join("run2.log"), "older").unwrap();

        rotate_old_logs(profile.path()).unwrap();

        assert_eq!(fs::read_dir(&logs).unwrap().count(), 0);
        let archive = profile.path().join(ARCHIVE_DIR);
        assert!(archive.join("run1.log").exists());
        assert!(archive.join("run2.log").exists());
    }

    #[test]
    fn test_rotate_without_log_dir_is_a_noop() {
        let profile = TempDir::new().unwrap();
        rotate_old_logs(profile.path()).unwrap();
        assert!(!profile.path().join(ARCHIVE_DIR).exists());
    }

    #[tokio::test]
    async fn test_discovery_window_exhausted() {
        let dir = TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        let found = LogTailer::discover(&dir.path().join("logs"), 3, fast(), &cancel)
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_discovery_finds_file_that_appears_late() {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("logs");
        let cancel = CancellationToken::new();

        let writer = {
            let logs = logs.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                fs::create_dir_all(&logs).unwrap();
                fs::write(logs.join("fbtest.log"), "hello\n").unwrap();
            })
        };

        let mut tailer = LogTailer::discover(&logs, 60, fast(), &cancel)
            .await
            .unwrap()
            .expect("log should be discovered");
        writer.await.unwrap();

        assert_eq!(tailer.next_event().await, TailEvent::Line("hello".into()));
        assert_eq!(tailer.next_event().await, TailEvent::Idle);
    }

    #[tokio::test]
    async fn test_discovery_honors_cancellation() {
        let dir = TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = LogTailer::discover(&dir.path().join("logs"), 60, fast(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn test_partial_line_buffered_until_newline() {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("logs");
        fs::create_dir_all(&logs).unwrap();
        let path = logs.join("fbtest.log");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, "first half").unwrap();

        let cancel = CancellationToken::new();
        let mut tailer = LogTailer::discover(&logs, 3, fast(), &cancel)
            .await
            .unwrap()
            .unwrap();

        // Incomplete line is not yielded yet
        assert_eq!(tailer.next_event().await, TailEvent::Idle);

        writeln!(file, ", second half").unwrap();
        assert_eq!(
            tailer.next_event().await,
            TailEvent::Line("first half, second half".into())
        );
    }
}
