use crate::cancel::CancellationToken;
use crate::error::{Result, VoxarchError};
use crate::request::{Device, ModelSize};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One transcribed span of the recording.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start_secs: f64, end_secs: f64, text: impl Into<String>) -> Self {
        Self {
            start_secs,
            end_secs,
            text: text.into(),
        }
    }
}

/// Lazy, single-pass segment sequence. Each `next` may run inference.
pub type SegmentStream = Box<dyn Iterator<Item = Result<TranscriptSegment>> + Send>;

/// An opened recording: its total duration and the segments still to decode.
pub struct OpenedAudio {
    pub duration_secs: f64,
    pub segments: SegmentStream,
}

impl std::fmt::Debug for OpenedAudio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedAudio")
            .field("duration_secs", &self.duration_secs)
            .field("segments", &"<lazy>")
            .finish()
    }
}

/// Speech-to-text engine.
///
/// This trait allows swapping implementations (real Whisper vs mock).
pub trait TranscriptionEngine: Send + Sync {
    /// Open `audio_path` for transcription on `device`.
    ///
    /// # Errors
    /// `SourceNotFound` if the file is missing, `DependencyUnavailable` if the
    /// model cannot be loaded, `AudioDecode` if the file cannot be decoded.
    fn open(&self, audio_path: &Path, model: ModelSize, device: Device) -> Result<OpenedAudio>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

impl<T: TranscriptionEngine> TranscriptionEngine for Arc<T> {
    fn open(&self, audio_path: &Path, model: ModelSize, device: Device) -> Result<OpenedAudio> {
        (**self).open(audio_path, model, device)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Which error a [`MockEngine`] raises from `open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOpenFailure {
    SourceNotFound,
    DependencyUnavailable,
    AudioDecode,
}

/// Mock engine for testing.
///
/// Yields scripted segments and counts how many were pulled. It can cancel a
/// token right after handing out the k-th segment, which simulates the user
/// pressing stop while segment k+1 is being decoded.
#[derive(Debug, Clone)]
pub struct MockEngine {
    duration_secs: f64,
    segments: Vec<TranscriptSegment>,
    open_failure: Option<MockOpenFailure>,
    fail_at: Option<usize>,
    cancel_after: Option<(usize, CancellationToken)>,
    pulled: Arc<AtomicUsize>,
    opened_with: Arc<Mutex<Option<(ModelSize, Device)>>>,
}

impl MockEngine {
    pub fn new(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            segments: Vec::new(),
            open_failure: None,
            fail_at: None,
            cancel_after: None,
            pulled: Arc::new(AtomicUsize::new(0)),
            opened_with: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_segment(mut self, start_secs: f64, end_secs: f64, text: &str) -> Self {
        self.segments
            .push(TranscriptSegment::new(start_secs, end_secs, text));
        self
    }

    /// Fail `open` with the given error.
    pub fn with_open_failure(mut self, failure: MockOpenFailure) -> Self {
        self.open_failure = Some(failure);
        self
    }

    /// Return an inference error instead of segment `index` (0-based).
    pub fn with_failure_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    /// Cancel `token` right after the `k`-th segment (1-based) is yielded.
    pub fn with_cancel_after(mut self, k: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((k, token));
        self
    }

    /// Number of segments pulled from the stream so far.
    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }

    /// Model and device of the last `open`.
    pub fn opened_with(&self) -> Option<(ModelSize, Device)> {
        self.opened_with.lock().ok().and_then(|guard| *guard)
    }
}

impl TranscriptionEngine for MockEngine {
    fn open(&self, audio_path: &Path, model: ModelSize, device: Device) -> Result<OpenedAudio> {
        if let Ok(mut opened) = self.opened_with.lock() {
            *opened = Some((model, device));
        }

        if let Some(failure) = self.open_failure {
            let path = audio_path.display().to_string();
            return Err(match failure {
                MockOpenFailure::SourceNotFound => VoxarchError::SourceNotFound { path },
                MockOpenFailure::DependencyUnavailable => VoxarchError::DependencyUnavailable {
                    message: "mock engine unavailable".to_string(),
                },
                MockOpenFailure::AudioDecode => VoxarchError::AudioDecode {
                    message: format!("mock cannot decode {path}"),
                },
            });
        }

        let pulled = Arc::clone(&self.pulled);
        let fail_at = self.fail_at;
        let cancel_after = self.cancel_after.clone();
        let segments = self
            .segments
            .clone()
            .into_iter()
            .enumerate()
            .map(move |(index, segment)| {
                let count = pulled.fetch_add(1, Ordering::SeqCst) + 1;
                if fail_at == Some(index) {
                    return Err(VoxarchError::DependencyUnavailable {
                        message: format!("mock inference failed at segment {index}"),
                    });
                }
                if let Some((k, token)) = &cancel_after
                    && count == *k
                {
                    token.cancel();
                }
                Ok(segment)
            });

        Ok(OpenedAudio {
            duration_secs: self.duration_secs,
            segments: Box::new(segments),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
