//! Location of installed Whisper models.
//!
//! Models are not downloaded by voxarch; they are expected as whisper.cpp
//! `ggml-<name>.bin` files in the models directory.

use crate::request::ModelSize;
use std::path::{Path, PathBuf};

/// Default models directory: `~/.cache/voxarch/models`.
pub fn default_models_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("voxarch")
        .join("models")
}

/// whisper.cpp model name for a size.
pub fn ggml_name(size: ModelSize) -> &'static str {
    match size {
        ModelSize::Tiny => "tiny",
        ModelSize::Base => "base",
        ModelSize::Small => "small",
        ModelSize::Medium => "medium",
        ModelSize::Large => "large-v3",
    }
}

/// Resolves model sizes to files in one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStore {
    dir: PathBuf,
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::new(default_models_dir())
    }
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at `dir` if given, else at the default location.
    pub fn from_override(dir: Option<&Path>) -> Self {
        dir.map(Self::new).unwrap_or_default()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Expected path of the model file. It may not exist.
    pub fn model_path(&self, size: ModelSize) -> PathBuf {
        self.dir.join(format!("ggml-{}.bin", ggml_name(size)))
    }

    pub fn is_installed(&self, size: ModelSize) -> bool {
        self.model_path(size).is_file()
    }
}
