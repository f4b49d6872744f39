//! Gemini `generateContent` client implementing `ImageClassifier`.
//!
//! Sends one inline image plus the instruction prompt and returns the text of
//! the first candidate. The API key travels in the `x-goog-api-key` header so
//! it never appears in URLs or error messages.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{LazyLock, Mutex};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::types::{EncodedImage, ImageClassifier};
use crate::config::AnalyzerConfig;

/// Sampling temperature for diagnosis requests. Low for reproducible answers.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

static MODEL_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9._-]*$").expect("static regex")
});

// ──────────────────────────────────────────────
// Error taxonomy
// ──────────────────────────────────────────────

/// Transport-level failures of the image classifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifierError {
    #[error("The AI service could not be reached")]
    NotReachable,

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("The AI service rejected the API key or permissions")]
    PermissionDenied,

    #[error("The AI service quota is exhausted")]
    ResourceExhausted,

    #[error("The AI service is temporarily unavailable")]
    Unavailable,

    #[error("The AI service returned an error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("The AI service returned no text")]
    EmptyResponse,

    #[error("Invalid model name: '{0}'")]
    InvalidModelName(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Could not read the AI service response: {0}")]
    ResponseParsing(String),
}

impl ClassifierError {
    /// Patient-facing message for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "AI服务授权失败，请联系客服",
            Self::ResourceExhausted => "AI服务请求次数已达上限，请稍后再试",
            Self::Unavailable | Self::Timeout(_) | Self::NotReachable => {
                "AI服务暂时不可用，请稍后再试"
            }
            Self::ResponseParsing(_) => "AI返回数据格式异常，请重试",
            Self::ApiError { .. }
            | Self::EmptyResponse
            | Self::InvalidModelName(_)
            | Self::Network(_) => "分析失败，请重试或联系客服",
        }
    }
}

/// Classify a non-2xx response by HTTP status and Google's status string.
pub fn classify_api_error(status: u16, body: &str) -> ClassifierError {
    let envelope: Option<GoogleErrorEnvelope> = serde_json::from_str(body).ok();
    let (google_status, message) = match envelope {
        Some(env) => (env.error.status.unwrap_or_default(), env.error.message),
        None => (String::new(), body.trim().to_string()),
    };

    let mentions = |needle: &str| google_status.contains(needle) || message.contains(needle);

    if mentions("PERMISSION_DENIED")
        || mentions("UNAUTHENTICATED")
        || mentions("API key")
        || status == 401
        || status == 403
    {
        ClassifierError::PermissionDenied
    } else if mentions("RESOURCE_EXHAUSTED") || status == 429 {
        ClassifierError::ResourceExhausted
    } else if mentions("UNAVAILABLE")
        || mentions("DEADLINE_EXCEEDED")
        || status == 503
        || status == 504
    {
        ClassifierError::Unavailable
    } else {
        ClassifierError::ApiError { status, message }
    }
}

/// Validate a Gemini model name; a `models/` prefix is accepted and stripped.
pub fn validate_model_name(name: &str) -> Result<String, ClassifierError> {
    let bare = name.trim().strip_prefix("models/").unwrap_or(name.trim());
    if MODEL_NAME_RE.is_match(bare) {
        Ok(bare.to_string())
    } else {
        Err(ClassifierError::InvalidModelName(name.to_string()))
    }
}

// ──────────────────────────────────────────────
// Wire types
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

/// Either inline image data or text.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    InlineData(InlineData),
    Text(String),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
}

impl GenerateContentRequest {
    /// Image first, then the instruction, as a single user turn.
    pub fn for_image(image: &EncodedImage, prompt: &str, temperature: f32) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData(InlineData {
                        mime_type: image.mime_type.clone(),
                        data: image.base64_data.clone(),
                    }),
                    Part::Text(prompt.to_string()),
                ],
            }],
            generation_config: GenerationConfig { temperature },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

// ──────────────────────────────────────────────
// GeminiClient
// ──────────────────────────────────────────────

/// Blocking HTTP client for the Gemini API.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, ClassifierError> {
        let model = validate_model_name(model)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model,
            client,
            timeout_secs: timeout.as_secs(),
            temperature: DEFAULT_TEMPERATURE,
        })
    }

    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, ClassifierError> {
        Self::new(&config.base_url, &config.api_key, &config.model, config.timeout)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn map_send_error(&self, e: reqwest::Error) -> ClassifierError {
        if e.is_timeout() {
            ClassifierError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            ClassifierError::NotReachable
        } else {
            // without_url: keep endpoint details out of user-visible errors
            ClassifierError::Network(e.without_url().to_string())
        }
    }
}

impl ImageClassifier for GeminiClient {
    fn classify_image(&self, image: &EncodedImage, prompt: &str) -> Result<String, ClassifierError> {
        let body = GenerateContentRequest::for_image(image, prompt, self.temperature);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let err = classify_api_error(status.as_u16(), &body);
            tracing::warn!(status = status.as_u16(), error = %err, "Gemini request failed");
            return Err(err);
        }

        let parsed: GenerateContentResponse = response
            .json()
            .map_err(|e| ClassifierError::ResponseParsing(e.without_url().to_string()))?;

        parsed.text().ok_or(ClassifierError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ──────────────────────────────────────────────
// MockImageClassifier (testing)
// ──────────────────────────────────────────────

/// Mock classifier: returns a configured answer or error.
pub struct MockImageClassifier {
    reply: Result<String, ClassifierError>,
    model: String,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockImageClassifier {
    pub fn new(response: &str) -> Self {
        Self {
            reply: Ok(response.to_string()),
            model: "mock-vision".to_string(),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn failing(error: ClassifierError) -> Self {
        Self {
            reply: Err(error),
            ..Self::new("")
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }
}

impl ImageClassifier for MockImageClassifier {
    fn classify_image(&self, _image: &EncodedImage, prompt: &str) -> Result<String, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }
        self.reply.clone()
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
