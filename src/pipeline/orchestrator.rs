//! Sequences transcription, analysis and solution generation for one run.

use crate::cancel::CancellationToken;
use crate::defaults;
use crate::document::router::OutputRouter;
use crate::error::{Result, VoxarchError};
use crate::generate::service::GenerativeTextService;
use crate::pipeline::stages::{self, GenerationOptions};
use crate::progress::ProgressSink;
use crate::request::PipelineRequest;
use crate::stt::engine::TranscriptionEngine;
use crate::stt::stage::{TranscriptionJob, TranscriptionStage};
use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::Arc;

/// Where a run is. Only the orchestrator changes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Transcribing,
    Analyzing,
    GeneratingSolution,
    Completed,
    Cancelled,
    Failed(String),
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => f.write_str("idle"),
            RunState::Transcribing => f.write_str("transcribing"),
            RunState::Analyzing => f.write_str("analyzing"),
            RunState::GeneratingSolution => f.write_str("generating solution"),
            RunState::Completed => f.write_str("completed"),
            RunState::Cancelled => f.write_str("cancelled"),
            RunState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every requested stage finished; `files` lists what was written.
    Completed { files: Vec<PathBuf> },
    Cancelled,
    Failed(VoxarchError),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }

    /// Status line shown when the run is finalized.
    pub fn terminal_message(&self) -> String {
        match self {
            RunOutcome::Completed { files } => {
                format!("Processing complete: {} file(s) written.", files.len())
            }
            RunOutcome::Cancelled => "Processing cancelled.".to_string(),
            RunOutcome::Failed(error) => format!("Processing failed: {error}"),
        }
    }

    fn state(&self) -> RunState {
        match self {
            RunOutcome::Completed { .. } => RunState::Completed,
            RunOutcome::Cancelled => RunState::Cancelled,
            RunOutcome::Failed(error) => RunState::Failed(error.to_string()),
        }
    }
}

/// Runs on every exit from [`Orchestrator::run`], unwinding included:
/// resets progress, posts the terminal status, then calls the cleanup hook.
struct Finalizer<'a, F: FnOnce()> {
    sink: &'a dyn ProgressSink,
    message: String,
    cleanup: Option<F>,
}

impl<'a, F: FnOnce()> Finalizer<'a, F> {
    fn new(sink: &'a dyn ProgressSink, cleanup: F) -> Self {
        Self {
            sink,
            message: "Processing aborted.".to_string(),
            cleanup: Some(cleanup),
        }
    }
}

impl<F: FnOnce()> Drop for Finalizer<'_, F> {
    fn drop(&mut self) {
        self.sink.report(0.0, &self.message);
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

/// Extract a readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .copied()
        .map(str::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Run one stage, turning a panic into `StagePanicked`.
fn guarded<T>(stage: &str, body: impl FnOnce() -> Result<T>) -> Result<T> {
    catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        tracing::error!(stage, "stage panicked: {message}");
        Err(VoxarchError::StagePanicked {
            stage: stage.to_string(),
            message,
        })
    })
}

/// Staged pipeline: Transcribe, then optionally Analyze, then optionally
/// Generate Solution. One run at a time.
pub struct Orchestrator {
    engine: Arc<dyn TranscriptionEngine>,
    service: Arc<dyn GenerativeTextService>,
    router: OutputRouter,
    options: GenerationOptions,
    gpu_available: bool,
    state: RunState,
    last_terminal: Option<RunState>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("engine", &self.engine.name())
            .field("router", &self.router)
            .field("options", &self.options)
            .field("state", &self.state)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn TranscriptionEngine>,
        service: Arc<dyn GenerativeTextService>,
    ) -> Self {
        Self {
            engine,
            service,
            router: OutputRouter::default(),
            options: GenerationOptions::default(),
            gpu_available: defaults::gpu_available(),
            state: RunState::Idle,
            last_terminal: None,
        }
    }

    pub fn with_router(mut self, router: OutputRouter) -> Self {
        self.router = router;
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Override GPU detection (tests).
    pub fn with_gpu_available(mut self, available: bool) -> Self {
        self.gpu_available = available;
        self
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Terminal state of the most recent run.
    pub fn last_terminal(&self) -> Option<&RunState> {
        self.last_terminal.as_ref()
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!(from = %self.state, to = %next, "run state");
        self.state = next;
    }

    /// Execute one run.
    ///
    /// Progress and status go to `sink`; `token` is polled between segments
    /// and between stages. Whatever happens, the sink gets a final
    /// `report(0.0, <status>)` and then `cleanup` is called exactly once.
    pub fn run(
        &mut self,
        request: PipelineRequest,
        token: &CancellationToken,
        sink: &dyn ProgressSink,
        cleanup: impl FnOnce(),
    ) -> RunOutcome {
        let outcome = {
            let mut finalizer = Finalizer::new(sink, cleanup);
            let outcome = self.execute(&request, token, sink);
            finalizer.message = outcome.terminal_message();
            match &outcome {
                RunOutcome::Completed { files } => {
                    tracing::info!(files = files.len(), "processing complete")
                }
                RunOutcome::Cancelled => tracing::info!("processing cancelled"),
                RunOutcome::Failed(error) => tracing::error!("processing failed: {error}"),
            }
            outcome
        };

        self.last_terminal = Some(self.state.clone());
        self.transition(RunState::Idle);
        outcome
    }

    fn finish(&mut self, outcome: RunOutcome) -> RunOutcome {
        self.transition(outcome.state());
        outcome
    }

    fn fail_or_cancel(&mut self, error: VoxarchError) -> RunOutcome {
        if error.is_cancelled() {
            self.finish(RunOutcome::Cancelled)
        } else {
            self.finish(RunOutcome::Failed(error))
        }
    }

    fn execute(
        &mut self,
        request: &PipelineRequest,
        token: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> RunOutcome {
        if let Err(error) = request.validate() {
            return self.finish(RunOutcome::Failed(error));
        }
        let mut files = Vec::new();

        // Stage 1: transcription (always)
        self.transition(RunState::Transcribing);
        sink.report(0.0, "Stage 1/3: Transcribing audio…");
        let engine = Arc::clone(&self.engine);
        let stage = TranscriptionStage::new(engine.as_ref()).with_gpu_available(self.gpu_available);
        let job = TranscriptionJob {
            audio_path: &request.audio_path,
            model: request.model_size,
            device: request.device,
            output_path: &request.output_path,
        };
        let transcript = match guarded("transcription", || stage.run(&job, token, sink)) {
            Ok(transcript) => transcript,
            Err(error) => return self.fail_or_cancel(error),
        };
        files.push(request.output_path.clone());

        // Stage 2: analysis
        if request.generate_analysis {
            if token.is_cancelled() {
                return self.finish(RunOutcome::Cancelled);
            }
            self.transition(RunState::Analyzing);
            sink.report(1.0, "Stage 2/3: Generating problem analysis…");
            let service = Arc::clone(&self.service);
            let options = &self.options;
            match guarded("analysis", || {
                stages::run_analysis(service.as_ref(), options, request, &transcript)
            }) {
                Ok(Some(path)) => files.push(path),
                Ok(None) => {}
                Err(error) => return self.fail_or_cancel(error),
            }
        }

        // Stage 3: solution
        if request.generate_solution {
            if token.is_cancelled() {
                return self.finish(RunOutcome::Cancelled);
            }
            self.transition(RunState::GeneratingSolution);
            let platform = request
                .platform
                .map(|p| p.to_string())
                .unwrap_or_default();
            sink.report(
                1.0,
                &format!("Stage 3/3: Generating solution proposal ({platform})…"),
            );
            let service = Arc::clone(&self.service);
            let options = &self.options;
            let router = &self.router;
            match guarded("solution", || {
                stages::run_solution(service.as_ref(), options, router, request, &transcript)
            }) {
                Ok(written) => files.extend(written),
                Err(error) => return self.fail_or_cancel(error),
            }
        }

        self.finish(RunOutcome::Completed { files })
    }
}
