//! Staged processing pipeline.
//!
//! One run moves through Transcribe → Analyze → Generate Solution on a
//! single worker. Stages are strictly sequential; cancellation and the
//! first error end the run.

pub mod orchestrator;
pub mod stages;

pub use orchestrator::{Orchestrator, RunOutcome, RunState};
pub use stages::{GenerationOptions, run_analysis, run_solution};
