//! Result types returned by the analysis entry points.

use crate::config::AnalysisMode;
use crate::prompts::Role;
use serde::{Deserialize, Serialize};

/// PDF document metadata, as reported by pdfium.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// One completed generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// 1-indexed position in the request.
    pub stage: usize,
    /// Team-review persona; `None` for single-call modes.
    pub role: Option<Role>,
    /// Character count of the prompt that was sent.
    pub prompt_chars: usize,
    /// Character count of the reply. The reply itself is handed to the
    /// next stage (or returned as the final text), not kept here.
    pub output_chars: usize,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
}

/// Aggregate numbers for one request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub page_count: usize,
    pub text_chars: usize,
    pub generation_calls: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub extract_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Finished analysis: the text to display plus how it was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub mode: AnalysisMode,
    /// The last generation call's reply, unmodified.
    pub text: String,
    /// Every generation call, in execution order.
    pub stages: Vec<StageResult>,
    /// `None` when the request started from text rather than a PDF.
    pub metadata: Option<DocumentMetadata>,
    pub stats: AnalysisStats,
}

impl AnalysisOutput {
    /// Split the text into display sections on blank lines, skipping
    /// sections that are only whitespace.
    pub fn sections(&self) -> Vec<&str> {
        split_sections(&self.text)
    }
}

/// Split `text` on blank lines (`"\n\n"`), dropping whitespace-only parts.
pub fn split_sections(text: &str) -> Vec<&str> {
    text.split("\n\n")
        .map(str::trim_end)
        .filter(|s| !s.trim().is_empty())
        .collect()
}
