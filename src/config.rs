//! Configuration types for paper analysis.
//!
//! Every knob lives in [`ReviewConfig`], built via [`ReviewConfigBuilder`].
//! The analysis mode itself is not part of the config: it is passed per
//! request as an [`AnalysisMode`], so one config can serve many requests.

use crate::error::ReviewError;
use crate::pipeline::llm::GenerationClient;
use crate::progress::ProgressCallback;
use crate::prompts::DEFAULT_SUMMARY_CHAR_LIMIT;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Model used when none is configured.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Configuration for a paper analysis request.
///
/// # Example
/// ```rust
/// use edgequake_paper_review::ReviewConfig;
///
/// let config = ReviewConfig::builder()
///     .api_key("AIza...")
///     .model("gemini-2.0-flash")
///     .temperature(0.4)
///     .build()
///     .unwrap();
/// assert_eq!(config.model.as_deref(), Some("gemini-2.0-flash"));
/// ```
#[derive(Clone)]
pub struct ReviewConfig {
    /// Credential for the Gemini REST API. Never printed by `Debug`.
    ///
    /// When `None`, `GEMINI_API_KEY` / `GOOGLE_API_KEY` are consulted.
    pub api_key: Option<String>,

    /// Model identifier. If None, uses [`DEFAULT_GEMINI_MODEL`] for Gemini or
    /// the provider default otherwise.
    pub model: Option<String>,

    /// Provider name routed through `edgequake_llm::ProviderFactory`
    /// (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed client. Takes precedence over everything else.
    pub client: Option<Arc<dyn GenerationClient>>,

    /// Sampling temperature. Default: 0.7.
    pub temperature: f32,

    /// Maximum tokens the model may generate per call. Default: 8192.
    pub max_tokens: usize,

    /// Character budget stated in the summary prompt. Default: 500.
    pub summary_char_limit: usize,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// HTTP transport timeout for each generation call in seconds. Default: 120.
    ///
    /// This is the only timeout applied to generation; there is no retry.
    pub api_timeout_secs: u64,

    /// Optional stage-level progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: None,
            provider_name: None,
            client: None,
            temperature: 0.7,
            max_tokens: 8192,
            summary_char_limit: DEFAULT_SUMMARY_CHAR_LIMIT,
            password: None,
            download_timeout_secs: 120,
            api_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ReviewConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("client", &self.client.as_ref().map(|c| c.name().to_string()))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("summary_char_limit", &self.summary_char_limit)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl ReviewConfig {
    /// Create a new builder for `ReviewConfig`.
    pub fn builder() -> ReviewConfigBuilder {
        ReviewConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ReviewConfig`].
#[derive(Debug)]
pub struct ReviewConfigBuilder {
    config: ReviewConfig,
}

impl ReviewConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn client(mut self, client: Arc<dyn GenerationClient>) -> Self {
        self.config.client = Some(client);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn summary_char_limit(mut self, n: usize) -> Self {
        self.config.summary_char_limit = n;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReviewConfig, ReviewError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(ReviewError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.summary_char_limit == 0 {
            return Err(ReviewError::InvalidConfig(
                "summary_char_limit must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ReviewError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if matches!(c.api_key.as_deref(), Some(k) if k.trim().is_empty()) {
            return Err(ReviewError::InvalidConfig("api_key is empty".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// What kind of analysis to run on the paper.
///
/// | Mode | Label | Generation calls |
/// |------|-------|------------------|
/// | [`TeamReview`](Self::TeamReview) | `team review` | 3 |
/// | [`Summary`](Self::Summary) | `summary` | 1 |
/// | [`Methodology`](Self::Methodology) | `methodology` | 1 |
/// | [`Results`](Self::Results) | `results analysis` | 1 |
/// | [`Question`](Self::Question) | `free-form question` | 1 |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "question", rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Three-stage sam → jenny → will pipeline.
    TeamReview,
    /// Short summary bounded by `summary_char_limit`.
    Summary,
    /// Explanation of the research methodology.
    Methodology,
    /// Analysis of the research results.
    Results,
    /// Answer to a user-supplied question.
    Question(String),
}

impl AnalysisMode {
    /// Human-readable label, as accepted by [`FromStr`].
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisMode::TeamReview => "team review",
            AnalysisMode::Summary => "summary",
            AnalysisMode::Methodology => "methodology",
            AnalysisMode::Results => "results analysis",
            AnalysisMode::Question(_) => "free-form question",
        }
    }

    /// Number of generation calls a successful run of this mode makes.
    pub fn call_count(&self) -> usize {
        match self {
            AnalysisMode::TeamReview => 3,
            _ => 1,
        }
    }

    /// Reject modes that cannot be sent as-is.
    pub fn validate(&self) -> Result<(), ReviewError> {
        if let AnalysisMode::Question(q) = self {
            if q.trim().is_empty() {
                return Err(ReviewError::InvalidConfig(
                    "free-form question mode requires a non-empty question".into(),
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AnalysisMode {
    type Err = ReviewError;

    /// Parse a mode label. `free-form question` parses to an empty
    /// question; fill it in before sending.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_lowercase().replace(['_', '-'], " ");
        match norm.as_str() {
            "team review" | "team" | "review" => Ok(AnalysisMode::TeamReview),
            "summary" => Ok(AnalysisMode::Summary),
            "methodology" => Ok(AnalysisMode::Methodology),
            "results analysis" | "results" => Ok(AnalysisMode::Results),
            "free form question" | "question" => Ok(AnalysisMode::Question(String::new())),
            _ => Err(ReviewError::InvalidConfig(format!(
                "unknown analysis mode '{s}' (expected: team review, summary, methodology, \
results analysis, free-form question)"
            ))),
        }
    }
}
