//! Configuration for voxarch.
//!
//! Read from `~/.config/voxarch/config.toml`, then environment overrides,
//! then CLI flags. Every section is optional and falls back to defaults.

use crate::defaults;
use crate::document::router::InfraLayout;
use crate::request::{DevicePreference, ModelSize};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transcription: TranscriptionConfig,
    pub generation: GenerationConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Speech-to-text settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub model: ModelSize,
    pub device: DevicePreference,
    /// Language code, or "auto" to detect
    pub language: String,
    /// Inference threads (None = whisper.cpp default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    /// Where ggml model files live (None = ~/.cache/voxarch/models)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models_dir: Option<PathBuf>,
}

/// Generative text service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub endpoint: String,
    pub analysis_model: String,
    /// Replaces the per-platform model for the solution stage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution_model: Option<String>,
    /// HTTP timeout per generation call (None = wait indefinitely)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

/// Output file layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub infra_layout: InfraLayout,
}

/// Log settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive; `RUST_LOG` wins when set
    pub filter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: ModelSize::default(),
            device: DevicePreference::default(),
            language: defaults::AUTO_LANGUAGE.to_string(),
            threads: None,
            models_dir: None,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: defaults::GEMINI_ENDPOINT.to_string(),
            analysis_model: defaults::ANALYSIS_MODEL.to_string(),
            solution_model: None,
            request_timeout_secs: None,
        }
    }
}

impl GenerationConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: defaults::LOG_FILTER.to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound) =>
            {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.context(format!("failed to load config from {}", path.display()))),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOXARCH_MODEL → transcription.model
    /// - VOXARCH_DEVICE → transcription.device
    /// - VOXARCH_LOG_FILE → logging.file
    /// - GEMINI_API_KEY → generation.api_key
    ///
    /// Unparseable model or device values are logged and ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("VOXARCH_MODEL")
            && !model.is_empty()
        {
            match model.parse() {
                Ok(size) => self.transcription.model = size,
                Err(e) => tracing::warn!("ignoring VOXARCH_MODEL: {e}"),
            }
        }

        if let Ok(device) = std::env::var("VOXARCH_DEVICE")
            && !device.is_empty()
        {
            match device.parse() {
                Ok(pref) => self.transcription.device = pref,
                Err(e) => tracing::warn!("ignoring VOXARCH_DEVICE: {e}"),
            }
        }

        if let Ok(file) = std::env::var("VOXARCH_LOG_FILE")
            && !file.is_empty()
        {
            self.logging.file = Some(PathBuf::from(file));
        }

        if let Ok(key) = std::env::var(defaults::API_KEY_ENV)
            && !key.trim().is_empty()
        {
            self.generation.api_key = Some(key);
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/voxarch/config.toml on Linux. Falls back to the
    /// working directory when no config directory can be determined.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voxarch")
            .join("config.toml")
    }

    /// Render the effective configuration as TOML, with the API key masked.
    pub fn to_display_toml(&self) -> anyhow::Result<String> {
        let mut shown = self.clone();
        if shown.generation.api_key.is_some() {
            shown.generation.api_key = Some("********".to_string());
        }
        Ok(toml::to_string_pretty(&shown)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_voxarch_env() {
        remove_env("VOXARCH_MODEL");
        remove_env("VOXARCH_DEVICE");
        remove_env("VOXARCH_LOG_FILE");
        remove_env("GEMINI_API_KEY");
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.transcription.model, ModelSize::Small);
        assert_eq!(config.transcription.device, DevicePreference::Cpu);
        assert_eq!(config.transcription.language, "auto");
        assert_eq!(config.transcription.threads, None);

        assert_eq!(config.generation.api_key, None);
        assert_eq!(config.generation.analysis_model, "gemini-1.5-flash");
        assert_eq!(config.generation.request_timeout(), None);

        assert_eq!(config.output.infra_layout, InfraLayout::Platform);
        assert_eq!(config.logging.filter, "info");
        assert_eq!(config.logging.file, None);
    }

    #[test]
    fn test_load_from_toml_file() {
        let toml_content = r#"
            [transcription]
            model = "medium"
            device = "gpu"
            language = "pt"
            threads = 8
            models_dir = "/opt/models"

            [generation]
            api_key = "abc"
            endpoint = "http://localhost:8080"
            analysis_model = "gemini-2.0-flash"
            solution_model = "gemini-2.0-pro"
            request_timeout_secs = 600

            [output]
            infra_layout = "flat"

            [logging]
            filter = "voxarch=debug"
            file = "voxarch.log"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.transcription.model, ModelSize::Medium);
        assert_eq!(config.transcription.device, DevicePreference::Gpu);
        assert_eq!(config.transcription.language, "pt");
        assert_eq!(config.transcription.threads, Some(8));
        assert_eq!(
            config.transcription.models_dir,
            Some(PathBuf::from("/opt/models"))
        );

        assert_eq!(config.generation.api_key.as_deref(), Some("abc"));
        assert_eq!(config.generation.endpoint, "http://localhost:8080");
        assert_eq!(config.generation.analysis_model, "gemini-2.0-flash");
        assert_eq!(
            config.generation.solution_model.as_deref(),
            Some("gemini-2.0-pro")
        );
        assert_eq!(
            config.generation.request_timeout(),
            Some(Duration::from_secs(600))
        );

        assert_eq!(config.output.infra_layout, InfraLayout::Flat);
        assert_eq!(config.logging.filter, "voxarch=debug");
        assert_eq!(config.logging.file, Some(PathBuf::from("voxarch.log")));
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let toml_content = r#"
            [transcription]
            model = "tiny"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.transcription.model, ModelSize::Tiny);
        assert_eq!(config.transcription.language, "auto");
        assert_eq!(config.generation, GenerationConfig::default());
        assert_eq!(config.output, OutputConfig::default());
    }

    #[test]
    fn test_load_rejects_unknown_model() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[transcription]\nmodel = \"huge\"\n")
            .unwrap();

        assert!(Config::load(temp_file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_invalid_toml_is_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[transcription\nmodel = ").unwrap();

        assert!(Config::load_or_default(temp_file.path()).is_err());
    }

    #[test]
    fn test_env_override_model_and_device() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_voxarch_env();

        set_env("VOXARCH_MODEL", "large");
        set_env("VOXARCH_DEVICE", "cuda");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.transcription.model, ModelSize::Large);
        assert_eq!(config.transcription.device, DevicePreference::Gpu);
        assert_eq!(config.transcription.language, "auto"); // Not overridden

        clear_voxarch_env();
    }

    #[test]
    fn test_env_override_invalid_model_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_voxarch_env();

        set_env("VOXARCH_MODEL", "enormous");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.transcription.model, ModelSize::Small);

        clear_voxarch_env();
    }

    #[test]
    fn test_env_override_api_key_and_log_file() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_voxarch_env();

        set_env("GEMINI_API_KEY", "from-env");
        set_env("VOXARCH_LOG_FILE", "/tmp/voxarch.log");
        let mut config = Config::default();
        config.generation.api_key = Some("from-file".to_string());
        let config = config.with_env_overrides();

        assert_eq!(config.generation.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/voxarch.log")));

        clear_voxarch_env();
    }

    #[test]
    fn test_env_override_empty_string_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_voxarch_env();

        set_env("VOXARCH_MODEL", "");
        set_env("GEMINI_API_KEY", "  ");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.transcription.model, ModelSize::Small);
        assert_eq!(config.generation.api_key, None);

        clear_voxarch_env();
    }

    #[test]
    fn test_default_path_ends_with_voxarch_config() {
        let path = Config::default_path();
        assert!(path.ends_with("voxarch/config.toml"));
    }

    #[test]
    fn test_display_toml_masks_api_key() {
        let mut config = Config::default();
        config.generation.api_key = Some("secret-value".to_string());

        let shown = config.to_display_toml().unwrap();

        assert!(!shown.contains("secret-value"));
        assert!(shown.contains("********"));
        assert!(shown.contains("[transcription]"));
    }
}
