//! Request handling: document in, analysis text out.
//!
//! Every entry point takes its inputs explicitly (document, mode, config);
//! nothing is kept between requests. A request either returns the finished
//! text or the first error it hit. There is no partial output.
//!
//! ```text
//! analyze(path | URL) ──▶ analyze_bytes(bytes) ──▶ run_analysis(text)
//!                          extract text             1 call or team × 3
//! ```

use crate::config::{AnalysisMode, ReviewConfig, DEFAULT_GEMINI_MODEL};
use crate::error::ReviewError;
use crate::output::{AnalysisOutput, AnalysisStats, DocumentMetadata, StageResult};
use crate::pipeline::extract::{self, DocumentText};
use crate::pipeline::llm::{GeminiClient, GenerationClient, ProviderClient};
use crate::pipeline::{input, team};
use crate::prompts;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Env vars consulted for a Gemini credential, in order.
pub const GEMINI_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Analyse a PDF given as a local path or HTTP/HTTPS URL.
///
/// # Example
/// ```rust,no_run
/// use edgequake_paper_review::{analyze, AnalysisMode, ReviewConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ReviewConfig::builder().api_key("AIza...").build()?;
/// let output = analyze("paper.pdf", AnalysisMode::TeamReview, &config).await?;
/// for section in output.sections() {
///     println!("{section}\n---");
/// }
/// # Ok(())
/// # }
/// ```
pub async fn analyze(
    input_str: impl AsRef<str>,
    mode: AnalysisMode,
    config: &ReviewConfig,
) -> Result<AnalysisOutput, ReviewError> {
    let input_str = input_str.as_ref();
    info!("Starting {} analysis: {}", mode, input_str);

    let loaded = input::load_input(input_str, config.download_timeout_secs).await?;
    analyze_bytes(loaded.bytes, mode, config).await
}

/// Analyse PDF bytes already in memory.
pub async fn analyze_bytes(
    bytes: Vec<u8>,
    mode: AnalysisMode,
    config: &ReviewConfig,
) -> Result<AnalysisOutput, ReviewError> {
    let total_start = Instant::now();
    mode.validate()?;

    // ── Step 1: Extract text ─────────────────────────────────────────────
    let extract_start = Instant::now();
    let (text, metadata) = extract::extract_document(bytes, config.password.as_deref()).await?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    info!(
        "Extracted {} chars from {} pages in {}ms",
        text.len(),
        text.page_count(),
        extract_duration_ms
    );

    // ── Step 2: Build the client ─────────────────────────────────────────
    let client = resolve_client(config)?;

    // ── Step 3: Generate ─────────────────────────────────────────────────
    let mut output = run_analysis(client.as_ref(), text, mode, config).await?;

    output.metadata = Some(metadata);
    output.stats.extract_duration_ms = extract_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Run `mode` over already-extracted text with the given client.
///
/// This is the whole analysis minus I/O: the team review makes three calls,
/// every other mode one. `output.metadata` is left `None`.
pub async fn run_analysis(
    client: &dyn GenerationClient,
    text: DocumentText,
    mode: AnalysisMode,
    config: &ReviewConfig,
) -> Result<AnalysisOutput, ReviewError> {
    mode.validate()?;
    if text.is_blank() {
        warn!("Document text is empty; the model will only see the instructions");
    }

    let total_stages = mode.call_count();
    let progress = config.progress_callback.as_ref();
    if let Some(cb) = progress {
        cb.on_analysis_start(total_stages, text.len());
    }

    let page_count = text.page_count();
    let text_chars = text.as_str().chars().count();
    let llm_start = Instant::now();

    let (raw, stages) = match single_prompt(&mode, text.as_str(), config) {
        None => {
            let report = team::run_team_review(client, text, progress).await?;
            (report.report, report.stages)
        }
        Some(prompt) => {
            let (stage, reply) = run_single(client, &prompt, config).await?;
            (reply, vec![stage])
        }
    };
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    if let Some(cb) = progress {
        cb.on_analysis_complete(total_stages);
    }

    let stats = AnalysisStats {
        page_count,
        text_chars,
        generation_calls: stages.len(),
        total_input_tokens: stages.iter().map(|s| s.input_tokens as u64).sum(),
        total_output_tokens: stages.iter().map(|s| s.output_tokens as u64).sum(),
        extract_duration_ms: 0,
        llm_duration_ms,
        total_duration_ms: llm_duration_ms,
    };

    info!(
        "{} complete: {} calls, {} tokens in / {} out, {}ms",
        mode, stats.generation_calls, stats.total_input_tokens, stats.total_output_tokens, llm_duration_ms
    );

    Ok(AnalysisOutput {
        mode,
        text: raw,
        stages,
        metadata: None,
        stats,
    })
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    input_str: impl AsRef<str>,
    mode: AnalysisMode,
    config: &ReviewConfig,
) -> Result<AnalysisOutput, ReviewError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ReviewError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(analyze(input_str, mode, config))
}

/// Analyse a PDF and write the resulting text to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn analyze_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    mode: AnalysisMode,
    config: &ReviewConfig,
) -> Result<AnalysisOutput, ReviewError> {
    let output = analyze(input_str, mode, config).await?;
    write_atomic(output_path.as_ref(), &output.text).await?;
    Ok(output)
}

/// Extract PDF metadata without any generation call or API key.
///
/// Only `download_timeout_secs` and `password` are read from `config`.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &ReviewConfig,
) -> Result<DocumentMetadata, ReviewError> {
    let loaded = input::load_input(input_str.as_ref(), config.download_timeout_secs).await?;
    extract::extract_metadata(loaded.bytes, config.password.as_deref()).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// The prompt for a single-call mode; `None` for the team review.
fn single_prompt(mode: &AnalysisMode, text: &str, config: &ReviewConfig) -> Option<String> {
    match mode {
        AnalysisMode::TeamReview => None,
        AnalysisMode::Summary => Some(prompts::summary_prompt(text, config.summary_char_limit)),
        AnalysisMode::Methodology => Some(prompts::methodology_prompt(text)),
        AnalysisMode::Results => Some(prompts::results_prompt(text)),
        AnalysisMode::Question(q) => Some(prompts::question_prompt(q.trim(), text)),
    }
}

async fn run_single(
    client: &dyn GenerationClient,
    prompt: &str,
    config: &ReviewConfig,
) -> Result<(StageResult, String), ReviewError> {
    let progress = config.progress_callback.as_ref();
    if let Some(cb) = progress {
        cb.on_stage_start(1, None);
    }
    debug!("Sending {} chars to {}", prompt.len(), client.name());

    match client.generate(prompt).await {
        Ok(generation) => {
            if let Some(cb) = progress {
                cb.on_stage_complete(1, None, generation.text.len());
            }
            let stage = StageResult {
                stage: 1,
                role: None,
                prompt_chars: prompt.chars().count(),
                output_chars: generation.text.chars().count(),
                input_tokens: generation.input_tokens,
                output_tokens: generation.output_tokens,
                duration_ms: generation.duration_ms,
            };
            Ok((stage, generation.text))
        }
        Err(e) => {
            if let Some(cb) = progress {
                cb.on_stage_error(1, None, &e.to_string());
            }
            Err(e)
        }
    }
}

async fn write_atomic(path: &Path, contents: &str) -> Result<(), ReviewError> {
    let write_failed = |source| ReviewError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(write_failed)?;
    Ok(())
}

fn gemini_key_from_env() -> Option<String> {
    GEMINI_KEY_ENV_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.trim().is_empty())
}

fn gemini_client(api_key: String, config: &ReviewConfig) -> Result<Arc<dyn GenerationClient>, ReviewError> {
    let model = config.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
    debug!("Using Gemini REST client, model {}", model);
    Ok(Arc::new(GeminiClient::new(api_key, model, config)?))
}

fn factory_client(
    provider_name: &str,
    model: &str,
    config: &ReviewConfig,
) -> Result<Arc<dyn GenerationClient>, ReviewError> {
    let provider: Arc<dyn LLMProvider> = ProviderFactory::create_llm_provider(provider_name, model)
        .map_err(|e| ReviewError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        })?;
    debug!("Using {} provider, model {}", provider_name, model);
    Ok(Arc::new(ProviderClient::new(provider_name, provider, config)))
}

/// Resolve the generation client, from most-specific to least-specific.
///
/// 1. **Pre-built client** (`config.client`) — used as-is.
/// 2. **Named provider** (`config.provider_name`) — `"gemini"` with a key
///    available goes to [`GeminiClient`]; anything else goes through
///    [`ProviderFactory::create_llm_provider`], which reads that provider's
///    API key from the environment.
/// 3. **Explicit credential** (`config.api_key`) — [`GeminiClient`].
/// 4. **Gemini key in the environment** (`GEMINI_API_KEY`, `GOOGLE_API_KEY`).
/// 5. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 6. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_client(config: &ReviewConfig) -> Result<Arc<dyn GenerationClient>, ReviewError> {
    // 1) Caller-provided client takes priority
    if let Some(ref client) = config.client {
        return Ok(Arc::clone(client));
    }

    // 2) Named provider
    if let Some(ref name) = config.provider_name {
        if name.eq_ignore_ascii_case("gemini") {
            if let Some(key) = config.api_key.clone().or_else(gemini_key_from_env) {
                return gemini_client(key, config);
            }
        }
        let model = config.model.as_deref().unwrap_or(if name.eq_ignore_ascii_case("gemini") {
            DEFAULT_GEMINI_MODEL
        } else {
            "gpt-4.1-nano"
        });
        return factory_client(name, model, config);
    }

    // 3) + 4) Gemini credential, explicit or from the environment
    if let Some(key) = config.api_key.clone().or_else(gemini_key_from_env) {
        return gemini_client(key, config);
    }

    // 5) EDGEQUAKE_LLM_PROVIDER + EDGEQUAKE_MODEL when both set
    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return factory_client(&prov, &model, config);
        }
    }

    // 6) Whatever the factory can find
    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ReviewError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No API key given and no LLM provider could be auto-detected.\n\
                Pass --api-key, set GEMINI_API_KEY, or configure another provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(Arc::new(ProviderClient::new("auto", llm_provider, config)))
}
