//! Extraction of token limits from provider rejection messages.
//!
//! Providers report per-minute token rejections as free text, e.g.
//! `"... on tokens per minute (TPM): Limit 12000, Requested 20322, please
//! reduce your message size and try again."`

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Limit and request size reported by a provider rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    pub limit: u64,
    pub requested: u64,
}

fn limit_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\blimit\s*[:=]?\s*(\d+)").expect("Invalid regex"))
}

fn requested_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\brequested\s*[:=]?\s*(\d+)").expect("Invalid regex"))
}

fn first_number(re: &Regex, message: &str) -> Option<u64> {
    re.captures(message)?.get(1)?.as_str().parse().ok()
}

/// Parse a rate-limit descriptor out of a provider error message.
///
/// Returns `None` unless both a `Limit` and a `Requested` figure are present.
/// Matching is case-insensitive and independent of which figure comes first.
pub fn parse_rate_limit_error(message: &str) -> Option<RateLimitInfo> {
    let limit = first_number(limit_regex(), message)?;
    let requested = first_number(requested_regex(), message)?;
    Some(RateLimitInfo { limit, requested })
}
