//! Streaming transcription stage: drives an engine segment by segment,
//! honouring cancellation between segments and reporting progress.

use crate::cancel::CancellationToken;
use crate::defaults;
use crate::error::{Result, VoxarchError};
use crate::persist;
use crate::progress::{ProgressSink, segment_message};
use crate::request::{Device, DevicePreference, ModelSize};
use crate::stt::engine::TranscriptionEngine;
use std::path::Path;

/// Completed transcript of one recording.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionResult {
    pub duration_secs: f64,
    /// Segment texts, trimmed and joined with one space.
    pub text: String,
    pub segment_count: usize,
}

/// Pick the device to run on. A GPU request on a build without an
/// accelerated backend falls back to CPU and yields a notice for the user.
pub fn resolve_device(preference: DevicePreference, gpu_available: bool) -> (Device, Option<String>) {
    match preference {
        DevicePreference::Cpu => (Device::Cpu, None),
        DevicePreference::Gpu if gpu_available => (Device::Gpu, None),
        DevicePreference::Gpu => (
            Device::Cpu,
            Some("GPU requested but this build has no GPU backend; using CPU".to_string()),
        ),
    }
}

/// Everything the stage needs besides the engine and the run-wide handles.
#[derive(Debug, Clone, Copy)]
pub struct TranscriptionJob<'a> {
    pub audio_path: &'a Path,
    pub model: ModelSize,
    pub device: DevicePreference,
    pub output_path: &'a Path,
}

pub struct TranscriptionStage<'a> {
    engine: &'a dyn TranscriptionEngine,
    gpu_available: bool,
}

impl<'a> TranscriptionStage<'a> {
    pub fn new(engine: &'a dyn TranscriptionEngine) -> Self {
        Self {
            engine,
            gpu_available: defaults::gpu_available(),
        }
    }

    /// Override GPU detection (tests).
    pub fn with_gpu_available(mut self, available: bool) -> Self {
        self.gpu_available = available;
        self
    }

    /// Transcribe the job's audio and write the transcript to its output path.
    ///
    /// On cancellation or any error nothing is written and accumulated text is
    /// discarded.
    pub fn run(
        &self,
        job: &TranscriptionJob<'_>,
        token: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> Result<TranscriptionResult> {
        if !job.audio_path.exists() {
            return Err(VoxarchError::SourceNotFound {
                path: job.audio_path.display().to_string(),
            });
        }

        let (device, notice) = resolve_device(job.device, self.gpu_available);
        if let Some(notice) = notice {
            tracing::warn!("{notice}");
            sink.report(0.0, &notice);
        }

        tracing::info!(
            engine = self.engine.name(),
            model = %job.model,
            ?device,
            audio = %job.audio_path.display(),
            "opening audio"
        );
        let opened = self.engine.open(job.audio_path, job.model, device)?;
        let duration = opened.duration_secs;
        if !(duration.is_finite() && duration > 0.0) {
            return Err(VoxarchError::AudioDecode {
                message: format!(
                    "{} has no audio (duration {duration})",
                    job.audio_path.display()
                ),
            });
        }

        let mut segments = opened.segments;
        let mut texts: Vec<String> = Vec::new();
        let mut segment_count = 0;
        let mut last_fraction = 0.0_f64;

        loop {
            if token.is_cancelled() {
                tracing::info!(segments = segment_count, "transcription cancelled");
                return Err(VoxarchError::Cancelled);
            }
            let Some(segment) = segments.next() else {
                break;
            };
            let segment = segment?;
            segment_count += 1;

            let text = segment.text.trim();
            if !text.is_empty() {
                texts.push(text.to_string());
            }

            let fraction = (segment.end_secs / duration).clamp(0.0, 1.0).max(last_fraction);
            last_fraction = fraction;
            sink.report(fraction, &segment_message(fraction, text));
        }

        sink.report(1.0, &format!("Transcription complete ({segment_count} segments)"));

        let text = texts.join(" ");
        persist::write_text(job.output_path, &text)?;
        tracing::info!(
            path = %job.output_path.display(),
            duration_secs = duration,
            segments = segment_count,
            "transcript saved"
        );

        Ok(TranscriptionResult {
            duration_secs: duration,
            text,
            segment_count,
        })
    }
}
