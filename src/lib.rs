//! voxarch - meeting recordings to transcripts, analyses and cloud designs
//!
//! A staged pipeline: transcribe a recording with Whisper, then optionally
//! ask a generative text service for a business-problem analysis and a
//! platform-specific solution proposal whose PlantUML diagrams and Terraform
//! files are extracted into separate artifacts.

// Error handling discipline: propagate, don't panic
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod cancel;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod document;
pub mod error;
pub mod generate;
#[cfg(feature = "cli")]
pub mod output;
pub mod persist;
pub mod pipeline;
pub mod progress;
pub mod request;
pub mod stt;

// Composition root - needs everything
pub mod app;

// Core seams (engine → orchestrator → sink)
pub use generate::service::GenerativeTextService;
pub use progress::ProgressSink;
pub use stt::engine::TranscriptionEngine;

// Pipeline
pub use cancel::CancellationToken;
pub use pipeline::{Orchestrator, RunOutcome, RunState};
pub use request::{DevicePreference, ModelSize, PipelineRequest, Platform};

// Error handling
pub use error::{Result, VoxarchError};

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
