//! Error types for the test runner
//!
//! Expected run outcomes (completion, suspected crash, missing log) are
//! modeled by [`crate::supervisor::Verdict`], not errors. This enum covers
//! the infrastructure failures that prevent a run from being supervised at
//! all.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the test runner
#[derive(Error, Debug)]
pub enum Error {
    // === Download Errors ===
    #[error("Failed to download '{url}': {reason}")]
    Download { url: String, reason: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    // === Launch Errors ===
    #[error("Could not start browser: {0}")]
    Launch(String),

    // === Cancellation ===
    #[error("Run cancelled")]
    Cancelled,

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create a download error for a URL
    pub fn download(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::Download {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
