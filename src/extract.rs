//! Recovery of a JSON payload from free-form model output
//!
//! Model output is not guaranteed to be bare JSON. The extractor runs an
//! ordered list of strategies, from most precise to most permissive, and
//! returns the first candidate any of them produces. Extraction never fails;
//! when nothing matches the raw text comes back unchanged and the caller's
//! JSON parse reports the problem.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// A single extraction attempt
pub type Strategy = fn(&str) -> Option<String>;

/// Strategies in priority order
pub const STRATEGIES: [(&str, Strategy); 4] = [
    ("bare_json", bare_json),
    ("fenced_block", fenced_block),
    ("object_span", object_span),
    ("brace_bounds", brace_bounds),
];

/// Produce the best JSON candidate found in `raw`
pub fn extract(raw: &str) -> String {
    STRATEGIES
        .iter()
        .find_map(|(name, strategy)| {
            strategy(raw).map(|candidate| {
                debug!("Extracted JSON candidate via {}", name);
                candidate
            })
        })
        .unwrap_or_else(|| raw.to_string())
}

/// Text that already parses as JSON, returned unchanged
pub fn bare_json(raw: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .map(|_| raw.to_string())
}

/// Contents of the first markdown code fence, optionally tagged `json`
pub fn fenced_block(raw: &str) -> Option<String> {
    static FENCE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("valid fence pattern")
    });

    FENCE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|content| !content.is_empty())
}

/// Greedy span from the first `{` to the last `}`
pub fn object_span(raw: &str) -> Option<String> {
    static OBJECT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("valid object pattern"));

    OBJECT.find(raw).map(|m| m.as_str().trim().to_string())
}

/// Backtick-stripped text between the first `{` and the last `}`, inclusive
pub fn brace_bounds(raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| *c != '`').collect();
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    (start < end).then(|| cleaned[start..=end].to_string())
}
