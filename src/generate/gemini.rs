//! Gemini `generateContent` client over blocking HTTP.

use crate::defaults;
use crate::error::{Result, VoxarchError};
use crate::generate::service::{GenerationRequest, GenerationSettings, GenerativeTextService};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    endpoint: String,
    timeout: Option<Duration>,
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new(defaults::GEMINI_ENDPOINT, None)
    }
}

impl GeminiClient {
    /// `timeout` of `None` waits as long as the service takes.
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn url_for(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, model)
    }

    // Built per call: the blocking client owns a runtime and must be created
    // and dropped off the async executor, on the worker that uses it.
    fn http_client(&self) -> Result<reqwest::blocking::Client> {
        reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| VoxarchError::ApiError {
                message: format!("failed to create HTTP client: {e}"),
            })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<&'a GenerationSettings>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

fn build_body<'a>(request: &'a GenerationRequest) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        contents: [Content {
            role: "user",
            parts: [Part {
                text: &request.prompt,
            }],
        }],
        generation_config: request.settings.as_ref(),
    }
}

/// Concatenate the text parts of the first candidate.
///
/// A blocked prompt is an error; a candidate with no text yields an empty
/// string so callers can decide what empty means for them.
fn extract_text(body: &str) -> Result<String> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| VoxarchError::ApiError {
            message: format!("unexpected response body: {e}"),
        })?;

    if let Some(reason) = parsed
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        return Err(VoxarchError::ApiError {
            message: format!("prompt blocked: {reason}"),
        });
    }

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        return Ok(String::new());
    };
    if let Some(reason) = &candidate.finish_reason
        && reason != "STOP"
    {
        tracing::warn!(finish_reason = %reason, "generation finished early");
    }

    Ok(candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default())
}

/// Best-effort message from a non-2xx response body.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(kind) => format!("HTTP {}: {} ({kind})", status.as_u16(), envelope.error.message),
            None => format!("HTTP {}: {}", status.as_u16(), envelope.error.message),
        },
        Err(_) => format!("HTTP {}: {}", status.as_u16(), body.trim()),
    }
}

impl GenerativeTextService for GeminiClient {
    fn generate(&self, request: &GenerationRequest, api_key: &str) -> Result<String> {
        let url = self.url_for(&request.model);
        tracing::debug!(model = %request.model, prompt_chars = request.prompt.chars().count(), "calling Gemini");

        let response = self
            .http_client()?
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&build_body(request))
            .send()
            .map_err(|e| VoxarchError::ApiError {
                message: if e.is_timeout() {
                    format!("request to {} timed out", request.model)
                } else if e.is_connect() {
                    format!("cannot reach {}: {e}", self.endpoint)
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        let body = response.text().map_err(|e| VoxarchError::ApiError {
            message: format!("failed to read response: {e}"),
        })?;
        if !status.is_success() {
            return Err(VoxarchError::ApiError {
                message: error_message(status, &body),
            });
        }

        let text = extract_text(&body)?;
        tracing::info!(model = %request.model, chars = text.len(), "Gemini response received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_model() {
        let client = GeminiClient::new("https://example.test/v1beta/", None);
        assert_eq!(
            client.url_for("gemini-1.5-pro"),
            "https://example.test/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn test_body_without_settings() {
        let request = GenerationRequest::new("m", "Olá");
        let json = serde_json::to_value(build_body(&request)).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Olá");
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_body_with_settings() {
        let request = GenerationRequest::new("m", "p").with_settings(Some(GenerationSettings {
            temperature: Some(0.6),
            top_p: Some(1.0),
            top_k: Some(32),
            max_output_tokens: Some(8192),
            response_mime_type: Some("text/plain".to_string()),
        }));
        let json = serde_json::to_value(build_body(&request)).unwrap();
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 8192);
        assert_eq!(json["generationConfig"]["responseMimeType"], "text/plain");
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let body = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Olá, "}, {"text": "mundo"}]},
                "finishReason": "STOP"
            }]
        }"#;
        assert_eq!(extract_text(body).unwrap(), "Olá, mundo");
    }

    #[test]
    fn test_extract_text_without_candidates_is_empty() {
        assert_eq!(extract_text(r#"{"candidates": []}"#).unwrap(), "");
        assert_eq!(extract_text("{}").unwrap(), "");
    }

    #[test]
    fn test_extract_text_candidate_without_content_is_empty() {
        let body = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        assert_eq!(extract_text(body).unwrap(), "");
    }

    #[test]
    fn test_blocked_prompt_is_api_error() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let err = extract_text(body).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_malformed_body_is_api_error() {
        assert!(matches!(
            extract_text("<html>"),
            Err(VoxarchError::ApiError { .. })
        ));
    }

    #[test]
    fn test_error_message_from_envelope() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(
            error_message(reqwest::StatusCode::BAD_REQUEST, body),
            "HTTP 400: API key not valid (INVALID_ARGUMENT)"
        );
    }

    #[test]
    fn test_error_message_from_plain_body() {
        assert_eq!(
            error_message(reqwest::StatusCode::BAD_GATEWAY, " upstream down \n"),
            "HTTP 502: upstream down"
        );
    }
}
