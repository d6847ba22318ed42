//! Remote text generation: the service seam, the Gemini client and prompts.

pub mod gemini;
pub mod prompts;
pub mod service;

pub use gemini::GeminiClient;
pub use prompts::{PlatformProfile, analysis_prompt};
pub use service::{
    GenerationRequest, GenerationSettings, GenerativeTextService, MockGenerativeService,
};
