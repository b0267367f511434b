//! Display helpers for model replies.
//!
//! The library never rewrites model output: `AnalysisOutput::text` is the
//! last stage's reply byte for byte. The binary may apply
//! [`strip_outer_fence`] before printing when asked to.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_OUTER_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\A```(markdown|md)?[ \t]*\r?\n(.*?)\r?\n```[ \t]*\z").unwrap()
});

static RE_FENCE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*```").unwrap());

/// Remove a single fence wrapping the whole reply, if there is one.
///
/// A ```` ```markdown ```` / ```` ```md ```` wrapper is always removed. A bare
/// ```` ``` ```` wrapper is only removed when the inner text contains no
/// other fence line, so a reply made of several code blocks is left alone.
/// Everything inside the wrapper, code blocks included, is returned as is.
pub fn strip_outer_fence(input: &str) -> &str {
    let trimmed = input.trim();
    let Some(caps) = RE_OUTER_FENCE.captures(trimmed) else {
        return input;
    };
    let Some(inner) = caps.get(2) else {
        return input;
    };

    let tagged = caps.get(1).is_some();
    if !tagged && RE_FENCE_LINE.is_match(inner.as_str()) {
        return input;
    }
    inner.as_str()
}
