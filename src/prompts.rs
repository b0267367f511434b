//! Prompt templates for paper analysis.
//!
//! Every prompt the library sends lives in this module, so unit tests can
//! inspect them directly without a model behind them.
//!
//! Two families exist:
//!
//! 1. **Team roles** ([`Role`]): the three personas of the team review,
//!    each a fixed template taking the previous stage's text.
//! 2. **Single-call prompts**: summary, methodology, results and free-form
//!    question, each taking the full document text.
//!
//! All builders are pure functions of their arguments.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default character budget for [`summary_prompt`].
pub const DEFAULT_SUMMARY_CHAR_LIMIT: usize = 500;

/// A persona in the three-stage team review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// AI PhD researcher: writes the initial plain-language draft.
    Sam,
    /// PhD in AI and education: simplifies and adds educational context.
    Jenny,
    /// Team lead: produces the polished final report.
    Will,
}

impl Role {
    /// Stage order of the team review.
    pub const ORDER: [Role; 3] = [Role::Sam, Role::Jenny, Role::Will];

    /// Lowercase key used by [`build_for_key`].
    pub fn key(self) -> &'static str {
        match self {
            Role::Sam => "sam",
            Role::Jenny => "jenny",
            Role::Will => "will",
        }
    }

    /// Short description of what this stage does, for progress output.
    pub fn task(self) -> &'static str {
        match self {
            Role::Sam => "initial draft",
            Role::Jenny => "simplification & context",
            Role::Will => "final report",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Error returned when parsing an unknown role key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}' (expected sam, jenny or will)", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sam" => Ok(Role::Sam),
            "jenny" => Ok(Role::Jenny),
            "will" => Ok(Role::Will),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Build the instruction for `role` with `text` interpolated.
///
/// Never returns an empty string.
pub fn build(role: Role, text: &str) -> String {
    match role {
        Role::Sam => sam_prompt(text),
        Role::Jenny => jenny_prompt(text),
        Role::Will => will_prompt(text),
    }
}

/// String-keyed variant of [`build`].
///
/// Unknown keys produce an empty string rather than an error; callers treat
/// an empty prompt as "nothing to send".
pub fn build_for_key(key: &str, text: &str) -> String {
    key.parse::<Role>()
        .map(|role| build(role, text))
        .unwrap_or_default()
}

fn sam_prompt(text: &str) -> String {
    format!(
        "You are Sam, an AI PhD researcher.\n\
Read the following paper carefully, identify its key points, methodology and results, \
and write an initial draft in simple terms:\n{text}"
    )
}

fn jenny_prompt(text: &str) -> String {
    format!(
        "You are Jenny, who holds a PhD in AI and education.\n\
Review the following analysis, explain it in simpler language, and add educational \
context and real-world applications:\n{text}"
    )
}

fn will_prompt(text: &str) -> String {
    format!(
        "You are Will, the team leader.\n\
Review the following content and write the final report.\n\
Check that every key point is included,\n\
keep a consistent tone and style,\n\
and structure it so it is easy to read:\n{text}"
    )
}

/// Summarise the paper within `char_limit` characters.
pub fn summary_prompt(text: &str, char_limit: usize) -> String {
    format!("Summarise the following paper in at most {char_limit} characters:\n{text}")
}

/// Explain the paper's main research methodology.
pub fn methodology_prompt(text: &str) -> String {
    format!("Explain the main research methodology of the following paper:\n{text}")
}

/// Analyse the paper's main research results.
pub fn results_prompt(text: &str) -> String {
    format!("Analyse the main research results of the following paper:\n{text}")
}

/// Answer a user question about the paper.
///
/// The question comes before the paper content so it survives truncation
/// on the provider side.
pub fn question_prompt(question: &str, text: &str) -> String {
    format!(
        "Answer the following question about the paper. Question: {question}\n\
Paper content:\n{text}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAPER: &str = "Paper about X achieves 95% accuracy.";

    #[test]
    fn build_is_pure() {
        for role in Role::ORDER {
            assert_eq!(build(role, PAPER), build(role, PAPER));
        }
    }

    #[test]
    fn sam_prompt_asks_for_key_points_methodology_results() {
        let p = build(Role::Sam, PAPER);
        assert!(p.contains(PAPER));
        assert!(p.contains("key points"));
        assert!(p.contains("methodology"));
        assert!(p.contains("results"));
        assert!(p.ends_with(PAPER));
    }

    #[test]
    fn jenny_and_will_embed_previous_text() {
        assert!(build(Role::Jenny, "Draft A").ends_with("\nDraft A"));
        assert!(build(Role::Will, "Draft B").ends_with("\nDraft B"));
        assert!(build(Role::Jenny, "x").contains("real-world applications"));
        assert!(build(Role::Will, "x").contains("final report"));
    }

    #[test]
    fn unknown_key_yields_empty_prompt() {
        assert_eq!(build_for_key("unknown", PAPER), "");
        assert_eq!(build_for_key("", PAPER), "");
    }

    #[test]
    fn key_lookup_is_case_insensitive() {
        assert_eq!(build_for_key(" SAM ", PAPER), build(Role::Sam, PAPER));
        assert_eq!(build_for_key("jenny", "t"), build(Role::Jenny, "t"));
    }

    #[test]
    fn role_roundtrips_through_key() {
        for role in Role::ORDER {
            assert_eq!(role.key().parse::<Role>(), Ok(role));
        }
        assert!("bob".parse::<Role>().is_err());
    }

    #[test]
    fn single_call_prompts_embed_document() {
        assert!(summary_prompt(PAPER, 500).contains("500 characters"));
        assert!(summary_prompt(PAPER, 500).ends_with(PAPER));
        assert!(methodology_prompt(PAPER).contains("methodology"));
        assert!(results_prompt(PAPER).contains("results"));

        let q = question_prompt("What dataset?", PAPER);
        let qi = q.find("What dataset?").unwrap();
        let pi = q.find(PAPER).unwrap();
        assert!(qi < pi, "question must precede the paper");
    }
}
