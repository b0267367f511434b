//! Team review: three personas refine the analysis in turn.
//!
//! ```text
//! document ──▶ sam ──▶ jenny ──▶ will ──▶ report
//!              draft   simplify  finalise
//! ```
//!
//! Each stage's output is the next stage's only input; the document text is
//! read by sam alone. Only one text value is held at a time: a stage's reply
//! replaces the text it was built from. The first failed call ends the
//! review with that error and no partial report.

use crate::error::ReviewError;
use crate::output::StageResult;
use crate::pipeline::extract::DocumentText;
use crate::pipeline::llm::GenerationClient;
use crate::progress::ProgressCallback;
use crate::prompts::{self, Role};
use tracing::{debug, info, warn};

/// Position of the review in its linear progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    /// Waiting for the given role's stage to run.
    Pending(Role),
    /// All three stages have produced output.
    Done,
}

impl ReviewState {
    /// Initial state: sam has not run yet.
    pub const START: ReviewState = ReviewState::Pending(Role::Sam);

    /// State after the current stage succeeded.
    pub fn next(self) -> ReviewState {
        match self {
            ReviewState::Pending(Role::Sam) => ReviewState::Pending(Role::Jenny),
            ReviewState::Pending(Role::Jenny) => ReviewState::Pending(Role::Will),
            ReviewState::Pending(Role::Will) | ReviewState::Done => ReviewState::Done,
        }
    }

    /// 1-indexed stage number of a pending state.
    pub fn stage(self) -> Option<usize> {
        match self {
            ReviewState::Pending(role) => Role::ORDER.iter().position(|r| *r == role).map(|i| i + 1),
            ReviewState::Done => None,
        }
    }
}

/// Outcome of a successful team review.
#[derive(Debug, Clone)]
pub struct TeamReport {
    /// Will's output, unmodified.
    pub report: String,
    /// One record per stage, in execution order. Records hold sizes and
    /// timings, never the intermediate drafts.
    pub stages: Vec<StageResult>,
}

/// Run sam → jenny → will over `text`, returning will's output.
pub async fn run_team_review(
    client: &dyn GenerationClient,
    text: DocumentText,
    progress: Option<&ProgressCallback>,
) -> Result<TeamReport, ReviewError> {
    info!("Team review: {} chars of input via {}", text.len(), client.name());

    let mut state = ReviewState::START;
    let mut current = text.into_string();
    let mut stages = Vec::with_capacity(Role::ORDER.len());

    while let ReviewState::Pending(role) = state {
        let stage = state.stage().unwrap_or(stages.len() + 1);
        let prompt = prompts::build(role, &current);

        if let Some(cb) = progress {
            cb.on_stage_start(stage, Some(role));
        }
        debug!("Stage {} ({}): sending {} chars", stage, role, prompt.len());

        let generation = match client.generate(&prompt).await {
            Ok(g) => g,
            Err(e) => {
                warn!("Stage {} ({}) failed: {}", stage, role, e);
                if let Some(cb) = progress {
                    cb.on_stage_error(stage, Some(role), &e.to_string());
                }
                return Err(e);
            }
        };

        if let Some(cb) = progress {
            cb.on_stage_complete(stage, Some(role), generation.text.len());
        }
        info!(
            "Stage {} ({}): {} chars in {}ms",
            stage,
            role,
            generation.text.len(),
            generation.duration_ms
        );

        stages.push(StageResult {
            stage,
            role: Some(role),
            prompt_chars: prompt.chars().count(),
            output_chars: generation.text.chars().count(),
            input_tokens: generation.input_tokens,
            output_tokens: generation.output_tokens,
            duration_ms: generation.duration_ms,
        });
        // The previous text is dropped here; only the newest reply survives.
        current = generation.text;
        state = state.next();
    }

    Ok(TeamReport {
        report: current,
        stages,
    })
}
