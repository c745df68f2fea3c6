//! Firebug test-run supervisor
//!
//! Launches a browser with the firebug and fbtest extensions installed and
//! supervises the run through the one artifact the harness produces: a log
//! file in the profile. The runner decides whether the suite finished,
//! never started, or most likely crashed, and reports that as its exit
//! status.

pub mod batch;
pub mod commands;
pub mod common;
pub mod config;
pub mod download;
pub mod profile;
pub mod runner;
pub mod supervisor;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use supervisor::Verdict;
