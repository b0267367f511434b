//! Generation clients: send one prompt, get one completion back.
//!
//! [`GenerationClient`] is the seam between the analysis logic and the
//! network. Everything above it (team review, single-call modes) is tested
//! against in-memory implementations; the two real implementations here
//! are thin:
//!
//! * [`GeminiClient`] talks to the Google Generative Language REST API
//!   directly, with the credential passed explicitly.
//! * [`ProviderClient`] adapts any `edgequake_llm::LLMProvider`, so OpenAI,
//!   Anthropic, Ollama and friends work through the same interface.
//!
//! One call is exactly one HTTP round trip. Neither client retries; a
//! failure goes straight back to the caller.

use crate::config::ReviewConfig;
use crate::error::ReviewError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Base URL of the Generative Language API.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Text returned by one generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
}

impl Generation {
    /// A generation carrying only text, for tests and custom clients.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// A single-shot text generation backend.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Provider name for logs and error messages.
    fn name(&self) -> &str;

    /// Send `prompt` and return the model's text.
    ///
    /// Errors: [`ReviewError::AuthError`] when the credential is rejected,
    /// any other generation-kind variant for remaining failures.
    async fn generate(&self, prompt: &str) -> Result<Generation, ReviewError>;
}

// ── Gemini REST client ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Direct client for Gemini's `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: usize,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Build a client for `model`, authenticating with `api_key`.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        config: &ReviewConfig,
    ) -> Result<Self, ReviewError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| ReviewError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_BASE_URL.to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Point the client at another endpoint (proxy, emulator).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<Generation, ReviewError> {
        let start = Instant::now();
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReviewError::ApiTimeout {
                        provider: self.name().to_string(),
                        elapsed_ms: start.elapsed().as_millis() as u64,
                    }
                } else {
                    ReviewError::LlmApiError {
                        message: format!("request to Gemini failed: {e}"),
                    }
                }
            })?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());
        let text = response.text().await.map_err(|e| ReviewError::LlmApiError {
            message: format!("failed to read Gemini response: {e}"),
        })?;

        if !(200..300).contains(&status) {
            return Err(classify_http_error(self.name(), status, &text, retry_after));
        }

        let mut generation = parse_generate_response(self.name(), &text)?;
        generation.duration_ms = start.elapsed().as_millis() as u64;
        debug!(
            "{}: {} input tokens, {} output tokens, {}ms",
            self.model, generation.input_tokens, generation.output_tokens, generation.duration_ms
        );
        Ok(generation)
    }
}

/// Map a non-2xx Gemini response to an error.
///
/// Gemini reports a bad key as `400 INVALID_ARGUMENT` with reason
/// `API_KEY_INVALID`, so 400 is inspected as well as 401/403.
fn classify_http_error(
    provider: &str,
    status: u16,
    body: &str,
    retry_after_secs: Option<u64>,
) -> ReviewError {
    let (message, api_status) = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|env| (env.error.message, env.error.status))
        .unwrap_or_else(|_| (body.trim().to_string(), String::new()));

    let key_rejected = body.contains("API_KEY_INVALID")
        || message.contains("API key not valid")
        || api_status == "UNAUTHENTICATED"
        || api_status == "PERMISSION_DENIED";

    match status {
        401 | 403 => ReviewError::AuthError {
            provider: provider.to_string(),
            detail: message,
        },
        400 if key_rejected => ReviewError::AuthError {
            provider: provider.to_string(),
            detail: message,
        },
        429 => ReviewError::RateLimitExceeded {
            provider: provider.to_string(),
            retry_after_secs,
        },
        _ => ReviewError::LlmApiError {
            message: format!("HTTP {status}: {message}"),
        },
    }
}

/// Pull the text and token usage out of a successful response body.
fn parse_generate_response(provider: &str, body: &str) -> Result<Generation, ReviewError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| ReviewError::LlmApiError {
            message: format!("malformed response from {provider}: {e}"),
        })?;

    let usage = parsed.usage_metadata.unwrap_or_default();

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        let reason = parsed
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|r| format!("prompt blocked ({r})"))
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(ReviewError::EmptyCompletion {
            provider: provider.to_string(),
            reason,
        });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(ReviewError::EmptyCompletion {
            provider: provider.to_string(),
            reason: format!(
                "finish reason {}",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ),
        });
    }

    Ok(Generation {
        text,
        input_tokens: usage.prompt_token_count,
        output_tokens: usage.candidates_token_count,
        duration_ms: 0,
    })
}

// ── edgequake-llm adapter ────────────────────────────────────────────────

/// Adapter running prompts through an `edgequake_llm` provider.
pub struct ProviderClient {
    name: String,
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl ProviderClient {
    pub fn new(
        name: impl Into<String>,
        provider: Arc<dyn LLMProvider>,
        config: &ReviewConfig,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            options: build_options(config),
        }
    }
}

#[async_trait]
impl GenerationClient for ProviderClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str) -> Result<Generation, ReviewError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::user(prompt)];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| classify_provider_error(&self.name, &e.to_string()))?;

        let duration_ms = start.elapsed().as_millis() as u64;
        debug!(
            "{}: {} input tokens, {} output tokens, {}ms",
            self.name, response.prompt_tokens, response.completion_tokens, duration_ms
        );

        if response.content.trim().is_empty() {
            return Err(ReviewError::EmptyCompletion {
                provider: self.name.clone(),
                reason: "empty content".to_string(),
            });
        }

        Ok(Generation {
            text: response.content,
            input_tokens: response.prompt_tokens as usize,
            output_tokens: response.completion_tokens as usize,
            duration_ms,
        })
    }
}

/// Build `CompletionOptions` from the review config.
fn build_options(config: &ReviewConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// An HTTP status code written next to a word that marks it as one
/// ("HTTP 401", "status: 429", "code 403"), or at the very start.
static RE_STATUS_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\A\s*|\b(?:https?|status(?:\s+code)?|code|error)\b[\s:=(]*)([1-5]\d{2})\b")
        .unwrap()
});

const AUTH_PHRASES: &[&str] = &[
    "unauthorized",
    "unauthenticated",
    "invalid api key",
    "incorrect api key",
    "api key not valid",
    "api_key_invalid",
    "authentication failed",
    "authentication error",
    "permission denied",
];

const RATE_LIMIT_PHRASES: &[&str] = &["rate limit", "too many requests"];

/// Classify a provider error from its message.
///
/// Providers surface HTTP failures as text. A status code counts only when
/// it reads as one; other digits (token counts, request ids) are ignored.
fn classify_provider_error(provider: &str, message: &str) -> ReviewError {
    let lower = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));
    let status = RE_STATUS_CODE
        .captures(message)
        .and_then(|c| c[1].parse::<u16>().ok());

    let auth = ReviewError::AuthError {
        provider: provider.to_string(),
        detail: message.to_string(),
    };
    let rate_limited = ReviewError::RateLimitExceeded {
        provider: provider.to_string(),
        retry_after_secs: None,
    };

    match status {
        Some(401 | 403) => auth,
        Some(429) => rate_limited,
        _ if has(AUTH_PHRASES) => auth,
        _ if has(RATE_LIMIT_PHRASES) => rate_limited,
        _ => ReviewError::LlmApiError {
            message: format!("{provider}: {message}"),
        },
    }
}
