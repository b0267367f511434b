//! Progress-callback trait for per-stage analysis events.
//!
//! Inject an [`Arc<dyn ReviewProgressCallback>`] via
//! [`crate::config::ReviewConfigBuilder::progress_callback`] to receive
//! events as the request moves through extraction and generation.
//!
//! Single-call modes report one stage (role `None`); the team review reports
//! three, in order sam → jenny → will. Events are always delivered in order
//! from the request's own task.
//!
//! # Example
//!
//! ```rust
//! use edgequake_paper_review::{ReviewConfig, ReviewProgressCallback, Role};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ReviewProgressCallback for CountingCallback {
//!     fn on_stage_complete(&self, stage: usize, _role: Option<Role>, output_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("stage {stage} done ({output_len} chars)");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//! let config = ReviewConfig::builder()
//!     .progress_callback(cb as Arc<dyn ReviewProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::prompts::Role;
use std::sync::Arc;

/// Called by the request handler as it processes each stage.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ReviewProgressCallback: Send + Sync {
    /// Called once after text extraction, before the first generation call.
    ///
    /// * `total_stages` — number of generation calls the request will make
    /// * `text_len`     — byte length of the extracted document text
    fn on_analysis_start(&self, total_stages: usize, text_len: usize) {
        let _ = (total_stages, text_len);
    }

    /// Called just before a generation request is sent.
    ///
    /// * `stage` — 1-indexed stage number
    /// * `role`  — team-review persona, `None` for single-call modes
    fn on_stage_start(&self, stage: usize, role: Option<Role>) {
        let _ = (stage, role);
    }

    /// Called when a stage returns text.
    fn on_stage_complete(&self, stage: usize, role: Option<Role>, output_len: usize) {
        let _ = (stage, role, output_len);
    }

    /// Called when a stage fails. No further stages run after this.
    fn on_stage_error(&self, stage: usize, role: Option<Role>, error: &str) {
        let _ = (stage, role, error);
    }

    /// Called once after the final stage succeeded.
    fn on_analysis_complete(&self, total_stages: usize) {
        let _ = total_stages;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ReviewProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ReviewConfig`].
pub type ProgressCallback = Arc<dyn ReviewProgressCallback>;
