//! Application composition root.
//!
//! Turns a [`Config`] plus command-line choices into a validated
//! [`PipelineRequest`] and a fully wired [`Orchestrator`]:
//! Whisper engine → Gemini client → output router.

use crate::config::Config;
use crate::document::router::OutputRouter;
use crate::error::Result;
use crate::generate::gemini::GeminiClient;
use crate::pipeline::orchestrator::Orchestrator;
use crate::pipeline::stages::GenerationOptions;
use crate::request::{DevicePreference, ModelSize, PipelineRequest, Platform, suggest_output_path};
use crate::stt::models::ModelStore;
use crate::stt::whisper::{WhisperConfig, WhisperEngine};
use std::path::PathBuf;
use std::sync::Arc;

/// Choices made for one run on the command line. `None` falls back to config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunChoices {
    pub audio: PathBuf,
    pub output: Option<PathBuf>,
    pub model: Option<ModelSize>,
    pub device: Option<DevicePreference>,
    pub analysis: bool,
    pub solution: Option<Platform>,
}

/// Model store selected by the configuration.
pub fn model_store(config: &Config) -> ModelStore {
    ModelStore::from_override(config.transcription.models_dir.as_deref())
}

/// Build the request for one run and check it before any stage starts.
///
/// Structural problems fail with `InvalidRequest`. A missing credential fails
/// here too when a generation stage was asked for, so the user finds out
/// before sitting through the transcription.
pub fn build_request(config: &Config, choices: RunChoices) -> Result<PipelineRequest> {
    let output_path = choices
        .output
        .unwrap_or_else(|| suggest_output_path(&choices.audio));

    let mut request = PipelineRequest::transcribe_only(choices.audio, output_path);
    request.model_size = choices.model.unwrap_or(config.transcription.model);
    request.device = choices.device.unwrap_or(config.transcription.device);
    request.generate_analysis = choices.analysis;
    request.generate_solution = choices.solution.is_some();
    request.platform = choices.solution;
    request.api_key = config.generation.api_key.clone();

    request.validate()?;
    if request.needs_credential() {
        request.credential()?;
    }
    Ok(request)
}

/// Wire the engine, the generative client and the router from config.
pub fn build_orchestrator(config: &Config) -> Orchestrator {
    let engine = WhisperEngine::new(WhisperConfig {
        models: model_store(config),
        language: config.transcription.language.clone(),
        threads: config.transcription.threads,
    });
    let client = GeminiClient::new(
        &config.generation.endpoint,
        config.generation.request_timeout(),
    );
    tracing::debug!(
        endpoint = %config.generation.endpoint,
        models = %model_store(config).dir().display(),
        "pipeline wired"
    );

    Orchestrator::new(Arc::new(engine), Arc::new(client))
        .with_router(OutputRouter::new(config.output.infra_layout))
        .with_options(GenerationOptions {
            analysis_model: config.generation.analysis_model.clone(),
            solution_model: config.generation.solution_model.clone(),
        })
}

/// One row of the `models` listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelStatus {
    pub size: ModelSize,
    pub size_mb: u32,
    pub path: PathBuf,
    pub installed: bool,
}

/// Install status of every model size in the configured store.
pub fn model_statuses(store: &ModelStore) -> Vec<ModelStatus> {
    ModelSize::ALL
        .into_iter()
        .map(|size| ModelStatus {
            size,
            size_mb: size.size_mb(),
            path: store.model_path(size),
            installed: store.is_installed(size),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VoxarchError;
    use crate::pipeline::orchestrator::RunState;
    use std::fs;
    use tempfile::TempDir;

    fn choices(audio: &str) -> RunChoices {
        RunChoices {
            audio: PathBuf::from(audio),
            ..Default::default()
        }
    }

    #[test]
    fn test_request_takes_config_defaults() {
        let mut config = Config::default();
        config.transcription.model = ModelSize::Medium;
        config.transcription.device = DevicePreference::Gpu;

        let request = build_request(&config, choices("/rec/call.wav")).unwrap();

        assert_eq!(request.model_size, ModelSize::Medium);
        assert_eq!(request.device, DevicePreference::Gpu);
        assert_eq!(request.output_path, PathBuf::from("/rec/Transcricao-call.txt"));
        assert!(!request.needs_credential());
    }

    #[test]
    fn test_cli_choices_win_over_config() {
        let mut config = Config::default();
        config.transcription.model = ModelSize::Medium;
        let mut run = choices("/rec/call.wav");
        run.model = Some(ModelSize::Tiny);
        run.device = Some(DevicePreference::Gpu);
        run.output = Some(PathBuf::from("/out/notes.txt"));

        let request = build_request(&config, run).unwrap();

        assert_eq!(request.model_size, ModelSize::Tiny);
        assert_eq!(request.device, DevicePreference::Gpu);
        assert_eq!(request.output_path, PathBuf::from("/out/notes.txt"));
    }

    #[test]
    fn test_generation_without_key_is_rejected_up_front() {
        let mut run = choices("/rec/call.wav");
        run.solution = Some(Platform::Aws);

        let err = build_request(&Config::default(), run).unwrap_err();

        assert!(matches!(err, VoxarchError::MissingCredential));
    }

    #[test]
    fn test_generation_with_key_carries_platform() {
        let mut config = Config::default();
        config.generation.api_key = Some("k".to_string());
        let mut run = choices("/rec/call.wav");
        run.analysis = true;
        run.solution = Some(Platform::Gcp);

        let request = build_request(&config, run).unwrap();

        assert!(request.generate_analysis);
        assert!(request.generate_solution);
        assert_eq!(request.platform, Some(Platform::Gcp));
        assert_eq!(request.credential().unwrap(), "k");
    }

    #[test]
    fn test_empty_audio_is_invalid() {
        let err = build_request(&Config::default(), choices("")).unwrap_err();
        assert!(matches!(err, VoxarchError::InvalidRequest { .. }));
    }

    #[test]
    fn test_orchestrator_starts_idle() {
        let orchestrator = build_orchestrator(&Config::default());
        assert_eq!(*orchestrator.state(), RunState::Idle);
        assert!(orchestrator.last_terminal().is_none());
    }

    #[test]
    fn test_model_statuses_reports_installed_files() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path());
        fs::write(store.model_path(ModelSize::Base), b"ggml").unwrap();

        let statuses = model_statuses(&store);

        assert_eq!(statuses.len(), ModelSize::ALL.len());
        let base = statuses.iter().find(|s| s.size == ModelSize::Base).unwrap();
        assert!(base.installed);
        assert_eq!(statuses.iter().filter(|s| s.installed).count(), 1);
    }

    #[test]
    fn test_model_store_follows_config_override() {
        let mut config = Config::default();
        config.transcription.models_dir = Some(PathBuf::from("/models"));
        assert_eq!(model_store(&config).dir(), std::path::Path::new("/models"));
    }
}
