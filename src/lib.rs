//! narrator - Narrate text books into chapter audio files
//!
//! Sends text chunk by chunk to a rate-limited cloud TTS provider, joins the
//! audio per chapter with ffmpeg and tags the result.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod batch;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod exec;
pub mod logging;
pub mod narration;
pub mod tts;

// Core traits
pub use exec::{CommandExecutor, SystemCommandExecutor};
pub use narration::rate::Clock;
pub use narration::retry::RetryPolicy;
pub use tts::SpeechProvider;

// Pipeline
pub use narration::{NarrationJob, NarrationOutcome, NarrationPipeline, PipelineSettings, RateBudgetTracker};

// Batch
pub use batch::{BatchOptions, BatchReport, run_batch};
pub use document::{Book, Chapter};

// Error handling
pub use error::{NarratorError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
