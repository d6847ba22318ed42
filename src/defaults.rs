//! Default configuration constants for voxarch.
//!
//! Shared constants used across configuration types and pipeline stages.

/// Sample rate expected by Whisper, in Hz.
pub const SAMPLE_RATE: u32 = 16000;

/// Language value that triggers automatic language detection.
pub const AUTO_LANGUAGE: &str = "auto";

/// Length of one Whisper decoding window in seconds.
///
/// The engine decodes the recording window by window so segments stream out
/// while the rest of the file is still pending. This is also the upper bound
/// on cancellation latency.
pub const WINDOW_SECS: u32 = 30;

/// Maximum characters of segment text shown in a progress message.
pub const PREVIEW_CHARS: usize = 120;

/// Maximum characters of a prompt written to the debug log.
pub const PROMPT_LOG_CHARS: usize = 200;

/// Base URL of the Gemini REST API.
pub const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Model used for the problem analysis.
pub const ANALYSIS_MODEL: &str = "gemini-1.5-flash";

/// Default log filter when neither `RUST_LOG` nor the config sets one.
pub const LOG_FILTER: &str = "info";

/// Report the GPU backend compiled into this build.
///
/// Returns a human-readable name based on the compile-time feature flags.
/// If no GPU backend is enabled, returns "CPU". OpenBLAS only speeds up the
/// CPU path, so it reports "CPU" too.
pub fn gpu_backend() -> &'static str {
    if cfg!(feature = "cuda") {
        "CUDA"
    } else if cfg!(feature = "vulkan") {
        "Vulkan"
    } else if cfg!(feature = "hipblas") {
        "HipBLAS (AMD)"
    } else {
        "CPU"
    }
}

/// True when this build can run inference on a GPU.
pub fn gpu_available() -> bool {
    gpu_backend() != "CPU"
}
