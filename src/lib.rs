//! # edgequake-paper-review
//!
//! Analyse research papers in PDF form with a text-generation model.
//!
//! The text layer of the PDF is extracted, wrapped in a fixed prompt
//! template and sent to a generation client. The default mode is a
//! **team review**: three personas work in sequence, each refining the
//! previous one's output.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    resolve local file or download from URL
//!  ├─ 2. Extract  concatenate page text via pdfium (spawn_blocking)
//!  ├─ 3. Prompt   fixed template for the chosen mode
//!  ├─ 4. Generate one call, or sam → jenny → will (fail-fast)
//!  ├─ 5. Polish   Markdown cleanup of the final text
//!  └─ 6. Output   final text + per-stage records + stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_paper_review::{analyze, AnalysisMode, ReviewConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Key taken from GEMINI_API_KEY when not set here
//!     let config = ReviewConfig::default();
//!     let output = analyze("paper.pdf", AnalysisMode::TeamReview, &config).await?;
//!     println!("{}", output.text);
//!     eprintln!("{} calls, {} tokens out",
//!         output.stats.generation_calls,
//!         output.stats.total_output_tokens);
//!     Ok(())
//! }
//! ```
//!
//! ## Analysis Modes
//!
//! | Mode | Calls | Prompt |
//! |------|-------|--------|
//! | `team review` | 3 | sam drafts, jenny simplifies, will finalises |
//! | `summary` | 1 | summary within a character budget (default 500) |
//! | `methodology` | 1 | main research methodology |
//! | `results analysis` | 1 | main research results |
//! | `question` | 1 | answer a free-form question |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paper-review` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-paper-review = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{
    analyze, analyze_bytes, analyze_sync, analyze_to_file, inspect, resolve_client, run_analysis,
};
pub use config::{AnalysisMode, ReviewConfig, ReviewConfigBuilder, DEFAULT_GEMINI_MODEL};
pub use error::{ErrorKind, ReviewError};
pub use output::{AnalysisOutput, AnalysisStats, DocumentMetadata, StageResult};
pub use pipeline::extract::DocumentText;
pub use pipeline::llm::{GeminiClient, Generation, GenerationClient, ProviderClient};
pub use pipeline::team::{run_team_review, TeamReport};
pub use progress::{NoopProgressCallback, ProgressCallback, ReviewProgressCallback};
pub use prompts::Role;
