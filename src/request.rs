//! Pipeline request and its selector enums.

use crate::error::{Result, VoxarchError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Whisper model size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Tiny,
    Base,
    #[default]
    Small,
    Medium,
    Large,
}

impl ModelSize {
    pub const ALL: [ModelSize; 5] = [
        ModelSize::Tiny,
        ModelSize::Base,
        ModelSize::Small,
        ModelSize::Medium,
        ModelSize::Large,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        }
    }

    /// Approximate download size of the ggml model, in MB.
    pub fn size_mb(self) -> u32 {
        match self {
            ModelSize::Tiny => 75,
            ModelSize::Base => 142,
            ModelSize::Small => 466,
            ModelSize::Medium => 1533,
            ModelSize::Large => 3094,
        }
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelSize {
    type Err = VoxarchError;

    fn from_str(s: &str) -> Result<Self> {
        ModelSize::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| VoxarchError::ConfigInvalidValue {
                key: "transcription.model".to_string(),
                message: format!("unknown model size '{s}' (expected tiny, base, small, medium or large)"),
            })
    }
}

/// Where inference should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    #[default]
    Cpu,
    /// Use the GPU if this build has an accelerated backend, else fall back to CPU.
    Gpu,
}

impl fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevicePreference::Cpu => f.write_str("cpu"),
            DevicePreference::Gpu => f.write_str("gpu"),
        }
    }
}

impl FromStr for DevicePreference {
    type Err = VoxarchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(DevicePreference::Cpu),
            "gpu" | "cuda" => Ok(DevicePreference::Gpu),
            other => Err(VoxarchError::ConfigInvalidValue {
                key: "transcription.device".to_string(),
                message: format!("unknown device '{other}' (expected cpu or gpu)"),
            }),
        }
    }
}

/// Device actually used after resolving the preference against the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Gpu,
}

/// Target cloud platform for the solution proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Platform {
    #[cfg_attr(feature = "cli", value(name = "azure"))]
    Azure,
    #[cfg_attr(feature = "cli", value(name = "aws"))]
    #[serde(rename = "AWS")]
    Aws,
    #[cfg_attr(feature = "cli", value(name = "gcp"))]
    #[serde(rename = "GCP")]
    Gcp,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Azure, Platform::Aws, Platform::Gcp];

    /// Display name, also used in output file names.
    pub fn label(self) -> &'static str {
        match self {
            Platform::Azure => "Azure",
            Platform::Aws => "AWS",
            Platform::Gcp => "GCP",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Platform {
    type Err = VoxarchError;

    fn from_str(s: &str) -> Result<Self> {
        Platform::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| VoxarchError::InvalidRequest {
                message: format!("unsupported platform '{s}' (expected Azure, AWS or GCP)"),
            })
    }
}

/// Everything one pipeline run needs. Immutable once the run starts.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRequest {
    pub audio_path: PathBuf,
    pub model_size: ModelSize,
    pub device: DevicePreference,
    /// Transcript destination; its directory and stem name the other artifacts.
    pub output_path: PathBuf,
    pub generate_analysis: bool,
    pub generate_solution: bool,
    /// Required iff `generate_solution`.
    pub platform: Option<Platform>,
    /// Credential for the generative service, checked where it is used.
    pub api_key: Option<String>,
}

impl PipelineRequest {
    /// Request for a transcript only.
    pub fn transcribe_only(audio_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            audio_path: audio_path.into(),
            model_size: ModelSize::default(),
            device: DevicePreference::default(),
            output_path: output_path.into(),
            generate_analysis: false,
            generate_solution: false,
            platform: None,
            api_key: None,
        }
    }

    pub fn with_analysis(mut self) -> Self {
        self.generate_analysis = true;
        self
    }

    pub fn with_solution(mut self, platform: Platform) -> Self {
        self.generate_solution = true;
        self.platform = Some(platform);
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Structural checks done before any stage runs.
    pub fn validate(&self) -> Result<()> {
        if self.audio_path.as_os_str().is_empty() {
            return Err(VoxarchError::InvalidRequest {
                message: "select an audio file to transcribe".to_string(),
            });
        }
        if self.output_path.as_os_str().is_empty() || self.output_path.file_stem().is_none() {
            return Err(VoxarchError::InvalidRequest {
                message: "set the transcript output file".to_string(),
            });
        }
        if self.generate_solution && self.platform.is_none() {
            return Err(VoxarchError::InvalidRequest {
                message: "select a cloud platform to generate the solution".to_string(),
            });
        }
        Ok(())
    }

    /// True when a later stage will call the generative service.
    pub fn needs_credential(&self) -> bool {
        self.generate_analysis || self.generate_solution
    }

    /// The credential, if present and non-blank.
    pub fn credential(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(VoxarchError::MissingCredential)
    }

    /// Directory the transcript lives in; other artifacts go next to it.
    pub fn output_dir(&self) -> PathBuf {
        self.output_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Transcript file name without extension; names the other artifacts.
    pub fn base_name(&self) -> String {
        self.output_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Default transcript path for an audio file: `Transcricao-<stem>.txt` next to it.
pub fn suggest_output_path(audio_path: &Path) -> PathBuf {
    match audio_path.file_stem() {
        Some(stem) => {
            let name = format!("Transcricao-{}.txt", stem.to_string_lossy());
            audio_path.with_file_name(name)
        }
        None => PathBuf::from("transcricao_final.txt"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PipelineRequest {
        PipelineRequest::transcribe_only("/audio/meeting.wav", "/out/meeting.txt")
    }

    #[test]
    fn test_model_size_parse_and_display() {
        assert_eq!("medium".parse::<ModelSize>().unwrap(), ModelSize::Medium);
        assert_eq!(" Large ".parse::<ModelSize>().unwrap(), ModelSize::Large);
        assert_eq!(ModelSize::Tiny.to_string(), "tiny");
        assert!("huge".parse::<ModelSize>().is_err());
    }

    #[test]
    fn test_device_parse() {
        assert_eq!("gpu".parse::<DevicePreference>().unwrap(), DevicePreference::Gpu);
        assert_eq!("CPU".parse::<DevicePreference>().unwrap(), DevicePreference::Cpu);
        assert!("tpu".parse::<DevicePreference>().is_err());
    }

    #[test]
    fn test_platform_parse_is_case_insensitive() {
        assert_eq!("aws".parse::<Platform>().unwrap(), Platform::Aws);
        assert_eq!("GCP".parse::<Platform>().unwrap(), Platform::Gcp);
        assert_eq!("Azure".parse::<Platform>().unwrap(), Platform::Azure);
        assert!("oracle".parse::<Platform>().is_err());
    }

    #[test]
    fn test_platform_serde_uses_labels() {
        let json = serde_json::to_string(&Platform::Aws).unwrap();
        assert_eq!(json, "\"AWS\"");
        let back: Platform = serde_json::from_str("\"GCP\"").unwrap();
        assert_eq!(back, Platform::Gcp);
    }

    #[test]
    fn test_validate_accepts_transcribe_only() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_audio_path() {
        let mut req = request();
        req.audio_path = PathBuf::new();
        assert!(matches!(
            req.validate(),
            Err(VoxarchError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_output_path() {
        let mut req = request();
        req.output_path = PathBuf::new();
        assert!(matches!(
            req.validate(),
            Err(VoxarchError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_validate_requires_platform_for_solution() {
        let mut req = request();
        req.generate_solution = true;
        let err = req.validate().unwrap_err();
        assert!(err.to_string().contains("platform"));
    }

    #[test]
    fn test_credential_rejects_blank_key() {
        assert!(matches!(
            request().credential(),
            Err(VoxarchError::MissingCredential)
        ));
        assert!(matches!(
            request().with_api_key("   ").credential(),
            Err(VoxarchError::MissingCredential)
        ));
        assert_eq!(request().with_api_key(" k ").credential().unwrap(), "k");
    }

    #[test]
    fn test_needs_credential() {
        assert!(!request().needs_credential());
        assert!(request().with_analysis().needs_credential());
        assert!(request().with_solution(Platform::Gcp).needs_credential());
    }

    #[test]
    fn test_output_dir_and_base_name() {
        let req = request();
        assert_eq!(req.output_dir(), PathBuf::from("/out"));
        assert_eq!(req.base_name(), "meeting");
    }

    #[test]
    fn test_output_dir_of_bare_file_name_is_empty() {
        let req = PipelineRequest::transcribe_only("a.wav", "notes.txt");
        assert_eq!(req.output_dir(), PathBuf::new());
        assert_eq!(req.base_name(), "notes");
    }

    #[test]
    fn test_suggest_output_path() {
        assert_eq!(
            suggest_output_path(Path::new("/rec/kickoff call.m4a")),
            PathBuf::from("/rec/Transcricao-kickoff call.txt")
        );
    }
}
