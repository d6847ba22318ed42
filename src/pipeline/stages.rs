//! The generation stages that follow transcription.

use crate::document::parser::parse;
use crate::document::router::{OutputRouter, analysis_file_name};
use crate::error::{Result, VoxarchError};
use crate::generate::prompts::{PlatformProfile, analysis_prompt, log_preview};
use crate::generate::service::{GenerationRequest, GenerativeTextService};
use crate::persist;
use crate::request::PipelineRequest;
use crate::stt::stage::TranscriptionResult;
use std::path::PathBuf;

/// Model selection for the generation stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    pub analysis_model: String,
    /// Overrides the platform profile's model when set.
    pub solution_model: Option<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            analysis_model: crate::defaults::ANALYSIS_MODEL.to_string(),
            solution_model: None,
        }
    }
}

/// Business-problem analysis of the transcript.
///
/// Returns the written file, or `None` when the service returned no text
/// (logged, not an error).
pub fn run_analysis(
    service: &dyn GenerativeTextService,
    options: &GenerationOptions,
    request: &PipelineRequest,
    transcript: &TranscriptionResult,
) -> Result<Option<PathBuf>> {
    let api_key = request.credential()?;

    let prompt = analysis_prompt(&transcript.text);
    tracing::debug!(model = %options.analysis_model, prompt = %log_preview(&prompt), "analysis prompt");
    let analysis = service.generate(
        &GenerationRequest::new(options.analysis_model.as_str(), prompt),
        api_key,
    )?;

    if analysis.trim().is_empty() {
        tracing::warn!("analysis came back empty; nothing saved");
        return Ok(None);
    }

    let path = request
        .output_dir()
        .join(analysis_file_name(&request.base_name()));
    persist::write_text(&path, &analysis)?;
    tracing::info!(path = %path.display(), "analysis saved");
    Ok(Some(path))
}

/// Cloud-solution proposal: generate, split into sections, write them.
pub fn run_solution(
    service: &dyn GenerativeTextService,
    options: &GenerationOptions,
    router: &OutputRouter,
    request: &PipelineRequest,
    transcript: &TranscriptionResult,
) -> Result<Vec<PathBuf>> {
    let api_key = request.credential()?;
    let platform = request.platform.ok_or_else(|| VoxarchError::InvalidRequest {
        message: "select a cloud platform to generate the solution".to_string(),
    })?;

    let profile = PlatformProfile::for_platform(platform);
    let model = options.solution_model.as_deref().unwrap_or(profile.model);
    let prompt = profile.prompt(&transcript.text);
    tracing::debug!(%platform, model, prompt = %log_preview(&prompt), "solution prompt");

    let document = service.generate(
        &GenerationRequest::new(model, prompt).with_settings(profile.settings.clone()),
        api_key,
    )?;
    if document.trim().is_empty() {
        return Err(VoxarchError::ApiError {
            message: format!("no content returned for the {platform} solution"),
        });
    }

    let sections = parse(&document);
    tracing::info!(
        %platform,
        diagrams = sections.diagrams.len(),
        infra_files = sections.infra_files.len(),
        "solution parsed"
    );

    router
        .write(
            &sections,
            &request.output_dir(),
            &request.base_name(),
            Some(platform),
        )
        .into_result()
}
