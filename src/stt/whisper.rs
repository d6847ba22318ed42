//! Whisper-based transcription engine.
//!
//! The recording is decoded up front, then fed to whisper.cpp one
//! [`WINDOW_SECS`](crate::defaults::WINDOW_SECS) window at a time as the
//! caller pulls segments. Nothing past the current window is inferred until
//! asked for, so a stopped run never pays for the rest of the file.
//!
//! # Feature Gate
//!
//! Real inference requires the `whisper` feature (and cmake at build time):
//!
//! ```bash
//! cargo build --features whisper
//! ```
//!
//! Without it, [`WhisperEngine::open`] fails with `DependencyUnavailable`.

use crate::defaults;
use crate::error::{Result, VoxarchError};
use crate::request::{Device, ModelSize};
use crate::stt::engine::{OpenedAudio, TranscriptionEngine};
use crate::stt::models::ModelStore;
use crate::stt::wav;
use std::path::Path;

#[cfg(feature = "whisper")]
use crate::stt::engine::TranscriptSegment;
#[cfg(feature = "whisper")]
use std::collections::VecDeque;
#[cfg(feature = "whisper")]
use std::sync::{Arc, Mutex, Once};
#[cfg(feature = "whisper")]
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

#[cfg(feature = "whisper")]
static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Beam width used for decoding.
#[cfg(feature = "whisper")]
const BEAM_SIZE: i32 = 5;

/// Configuration for the Whisper engine.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    pub models: ModelStore,
    /// Language code (e.g. "pt", "en"), or "auto" to detect.
    pub language: String,
    /// Number of threads for inference (None = whisper.cpp default)
    pub threads: Option<usize>,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            models: ModelStore::default(),
            language: defaults::AUTO_LANGUAGE.to_string(),
            threads: None,
        }
    }
}

/// Whisper engine. Keeps the last loaded model so repeated runs with the
/// same size and device skip the load.
#[cfg(feature = "whisper")]
pub struct WhisperEngine {
    config: WhisperConfig,
    loaded: Mutex<Option<(ModelSize, Device, Arc<WhisperContext>)>>,
}

#[cfg(feature = "whisper")]
impl std::fmt::Debug for WhisperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperEngine")
            .field("config", &self.config)
            .field("loaded", &"<WhisperContext>")
            .finish()
    }
}

/// Whisper engine placeholder (without whisper feature).
#[cfg(not(feature = "whisper"))]
#[derive(Debug)]
pub struct WhisperEngine {
    config: WhisperConfig,
}

impl WhisperEngine {
    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }

    fn check_source(audio_path: &Path) -> Result<()> {
        if audio_path.is_file() {
            Ok(())
        } else {
            Err(VoxarchError::SourceNotFound {
                path: audio_path.display().to_string(),
            })
        }
    }
}

#[cfg(feature = "whisper")]
impl WhisperEngine {
    pub fn new(config: WhisperConfig) -> Self {
        // Route whisper.cpp output away from stderr (only once)
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });
        Self {
            config,
            loaded: Mutex::new(None),
        }
    }

    fn context(&self, model: ModelSize, device: Device) -> Result<Arc<WhisperContext>> {
        let mut loaded = self
            .loaded
            .lock()
            .map_err(|e| VoxarchError::DependencyUnavailable {
                message: format!("model cache lock poisoned: {e}"),
            })?;

        if let Some((size, dev, context)) = loaded.as_ref()
            && *size == model
            && *dev == device
        {
            return Ok(Arc::clone(context));
        }

        let model_path = self.config.models.model_path(model);
        if !model_path.is_file() {
            return Err(VoxarchError::DependencyUnavailable {
                message: format!(
                    "Whisper model '{model}' not installed (expected {})",
                    model_path.display()
                ),
            });
        }

        let mut context_params = WhisperContextParameters::default();
        context_params.use_gpu(device == Device::Gpu);
        // Fused attention kernels; avoids the standalone softmax kernel on newer GPUs
        context_params.flash_attn(device == Device::Gpu);
        let path_str = model_path
            .to_str()
            .ok_or_else(|| VoxarchError::DependencyUnavailable {
                message: "Invalid UTF-8 in model path".to_string(),
            })?;

        tracing::info!(model = %model, ?device, path = %model_path.display(), "loading Whisper model");
        let context = WhisperContext::new_with_params(path_str, context_params).map_err(|e| {
            VoxarchError::DependencyUnavailable {
                message: format!("Failed to load Whisper model: {e}"),
            }
        })?;

        let context = Arc::new(context);
        *loaded = Some((model, device, Arc::clone(&context)));
        Ok(context)
    }
}

#[cfg(not(feature = "whisper"))]
impl WhisperEngine {
    pub fn new(config: WhisperConfig) -> Self {
        Self { config }
    }
}

#[cfg(feature = "whisper")]
impl TranscriptionEngine for WhisperEngine {
    fn open(&self, audio_path: &Path, model: ModelSize, device: Device) -> Result<OpenedAudio> {
        Self::check_source(audio_path)?;
        let context = self.context(model, device)?;
        let audio = wav::decode_file(audio_path)?;
        let duration_secs = audio.duration_secs();
        tracing::debug!(duration_secs, "decoded audio");

        Ok(OpenedAudio {
            duration_secs,
            segments: Box::new(WindowedSegments {
                context,
                samples: audio.samples,
                language: self.config.language.clone(),
                threads: self.config.threads,
                next_window: 0,
                pending: VecDeque::new(),
                failed: false,
            }),
        })
    }

    fn name(&self) -> &str {
        "whisper"
    }
}

#[cfg(not(feature = "whisper"))]
impl TranscriptionEngine for WhisperEngine {
    fn open(&self, audio_path: &Path, model: ModelSize, _device: Device) -> Result<OpenedAudio> {
        Self::check_source(audio_path)?;
        // Still decode so format problems surface the same way as with the feature on
        wav::decode_file(audio_path)?;
        Err(VoxarchError::DependencyUnavailable {
            message: format!(
                concat!(
                    "cannot load model '{}': this binary was built without speech recognition.\n",
                    "To fix: cargo build --release --features whisper\n",
                    "If build fails with cmake errors, install: sudo apt install cmake"
                ),
                model
            ),
        })
    }

    fn name(&self) -> &str {
        "whisper (disabled)"
    }
}

/// Lazy segment stream over fixed-size decoding windows.
#[cfg(feature = "whisper")]
struct WindowedSegments {
    context: Arc<WhisperContext>,
    samples: Vec<f32>,
    language: String,
    threads: Option<usize>,
    next_window: usize,
    pending: VecDeque<TranscriptSegment>,
    failed: bool,
}

#[cfg(feature = "whisper")]
impl WindowedSegments {
    const WINDOW_SAMPLES: usize = (defaults::WINDOW_SECS * defaults::SAMPLE_RATE) as usize;

    fn window_count(&self) -> usize {
        self.samples.len().div_ceil(Self::WINDOW_SAMPLES)
    }

    /// Run inference on the next window and queue its segments.
    fn decode_next_window(&mut self) -> Result<()> {
        let start = self.next_window * Self::WINDOW_SAMPLES;
        let end = (start + Self::WINDOW_SAMPLES).min(self.samples.len());
        let offset_secs = start as f64 / defaults::SAMPLE_RATE as f64;
        self.next_window += 1;

        let inference_failed = |message: String| VoxarchError::DependencyUnavailable { message };

        let mut state = self
            .context
            .create_state()
            .map_err(|e| inference_failed(format!("Failed to create Whisper state: {e}")))?;

        let mut params = FullParams::new(SamplingStrategy::BeamSearch {
            beam_size: BEAM_SIZE,
            patience: -1.0,
        });
        if self.language == defaults::AUTO_LANGUAGE {
            params.set_language(None);
        } else {
            params.set_language(Some(&self.language));
        }
        if let Some(threads) = self.threads {
            params.set_n_threads(threads as i32);
        }
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, &self.samples[start..end])
            .map_err(|e| inference_failed(format!("Whisper inference failed: {e}")))?;

        for segment in state.as_iter() {
            // Timestamps are in centiseconds, relative to the window
            let seg_start = offset_secs + segment.start_timestamp() as f64 / 100.0;
            let seg_end = offset_secs + segment.end_timestamp() as f64 / 100.0;
            self.pending.push_back(TranscriptSegment::new(
                seg_start,
                seg_end,
                segment.to_string().trim(),
            ));
        }
        Ok(())
    }
}

#[cfg(feature = "whisper")]
impl Iterator for WindowedSegments {
    type Item = Result<TranscriptSegment>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(segment) = self.pending.pop_front() {
                return Some(Ok(segment));
            }
            if self.next_window >= self.window_count() {
                return None;
            }
            if let Err(e) = self.decode_next_window() {
                self.failed = true;
                return Some(Err(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_silence(path: &Path, secs: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: defaults::SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..secs * defaults::SAMPLE_RATE {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn engine_with_models(dir: &Path) -> WhisperEngine {
        WhisperEngine::new(WhisperConfig {
            models: ModelStore::new(dir),
            ..Default::default()
        })
    }

    #[test]
    fn test_whisper_config_default() {
        let config = WhisperConfig::default();
        assert_eq!(config.language, defaults::AUTO_LANGUAGE);
        assert_eq!(config.threads, None);
    }

    #[test]
    fn test_open_missing_audio_is_source_not_found() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_models(dir.path());
        let result = engine.open(&dir.path().join("nope.wav"), ModelSize::Tiny, Device::Cpu);
        assert!(matches!(result, Err(VoxarchError::SourceNotFound { .. })));
    }

    #[test]
    fn test_open_without_model_is_dependency_unavailable() {
        let dir = TempDir::new().unwrap();
        let audio = dir.path().join("silence.wav");
        write_silence(&audio, 1);

        let engine = engine_with_models(&dir.path().join("empty-models"));
        let result = engine.open(&audio, ModelSize::Tiny, Device::Cpu);
        assert!(matches!(
            result,
            Err(VoxarchError::DependencyUnavailable { .. })
        ));
    }

    #[test]
    fn test_whisper_engine_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<WhisperEngine>();
        assert_sync::<WhisperEngine>();
    }

    // Runs when a model is installed; prints a visible warning and skips when not.
    #[cfg(feature = "whisper")]
    #[test]
    fn test_whisper_streams_silence_with_real_model() {
        let store = ModelStore::default();
        let Some(size) = ModelSize::ALL.into_iter().find(|s| store.is_installed(*s)) else {
            eprintln!();
            eprintln!("  WARNING: no Whisper model in {}; skipping", store.dir().display());
            eprintln!();
            return;
        };

        let dir = TempDir::new().unwrap();
        let audio = dir.path().join("silence.wav");
        write_silence(&audio, 2);

        let engine = WhisperEngine::new(WhisperConfig::default());
        let opened = engine.open(&audio, size, Device::Cpu).unwrap();
        assert!((opened.duration_secs - 2.0).abs() < 0.01);
        for segment in opened.segments {
            let segment = segment.unwrap();
            assert!(segment.end_secs <= 30.0);
        }
    }
}
