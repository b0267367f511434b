//! Pipeline stages for paper analysis.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ llm (× 1 or team × 3)
//! (path/URL)  (pdfium)    (Gemini / provider)
//! ```
//!
//! 1. [`input`]   — load the user-supplied path or URL into memory
//! 2. [`extract`] — pdfium text layer, concatenated in page order
//! 3. [`llm`]     — the [`llm::GenerationClient`] seam and its implementations
//! 4. [`team`]    — sam → jenny → will, each stage feeding the next
//! 5. [`postprocess`] — optional display helpers used by the binary

pub mod extract;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod team;
