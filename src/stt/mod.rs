//! Speech-to-text: the engine seam, the Whisper engine and the streaming stage.

pub mod engine;
pub mod models;
pub mod stage;
pub mod wav;
pub mod whisper;

pub use engine::{
    MockEngine, MockOpenFailure, OpenedAudio, SegmentStream, TranscriptSegment,
    TranscriptionEngine,
};
pub use models::ModelStore;
pub use stage::{TranscriptionJob, TranscriptionResult, TranscriptionStage, resolve_device};
pub use whisper::{WhisperConfig, WhisperEngine};
