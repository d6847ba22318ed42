use crate::error::{Result, VoxarchError};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Sampling settings sent with a generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

/// One prompt for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub settings: Option<GenerationSettings>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            settings: None,
        }
    }

    pub fn with_settings(mut self, settings: Option<GenerationSettings>) -> Self {
        self.settings = settings;
        self
    }
}

/// Remote text generation.
///
/// This trait allows swapping implementations (Gemini vs mock). Calls block;
/// run them off any async executor.
pub trait GenerativeTextService: Send + Sync {
    /// Generate text for `request`. Any failure is `ApiError`.
    fn generate(&self, request: &GenerationRequest, api_key: &str) -> Result<String>;
}

impl<T: GenerativeTextService> GenerativeTextService for Arc<T> {
    fn generate(&self, request: &GenerationRequest, api_key: &str) -> Result<String> {
        (**self).generate(request, api_key)
    }
}

/// Mock service for testing.
///
/// Responses are handed out in order; once the script runs out the last
/// response repeats. Every call is counted and recorded.
#[derive(Debug, Clone, Default)]
pub struct MockGenerativeService {
    responses: Arc<Mutex<VecDeque<std::result::Result<String, String>>>>,
    fallback: Arc<Mutex<Option<std::result::Result<String, String>>>>,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl MockGenerativeService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn with_response(self, text: &str) -> Self {
        self.push(Ok(text.to_string()));
        self
    }

    /// Queue an `ApiError` response.
    pub fn with_failure(self, message: &str) -> Self {
        self.push(Err(message.to_string()));
        self
    }

    fn push(&self, response: std::result::Result<String, String>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response);
        }
    }

    /// Number of `generate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl GenerativeTextService for MockGenerativeService {
    fn generate(&self, request: &GenerationRequest, _api_key: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let next = self
            .responses
            .lock()
            .ok()
            .and_then(|mut responses| responses.pop_front());
        let response = match next {
            Some(response) => {
                if let Ok(mut fallback) = self.fallback.lock() {
                    *fallback = Some(response.clone());
                }
                response
            }
            None => self
                .fallback
                .lock()
                .ok()
                .and_then(|fallback| fallback.clone())
                .unwrap_or_else(|| Ok(String::new())),
        };

        response.map_err(|message| VoxarchError::ApiError { message })
    }
}
