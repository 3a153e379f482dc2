//! Token estimation and per-request character budgets.

/// Estimate the token count of a text from its word count.
///
/// Uses the `1.3 tokens per word` heuristic, rounded down. This is never an
/// exact count; it only decides whether a text needs to be chunked at all.
pub fn estimate_tokens(word_count: usize) -> usize {
    // floor(n * 1.3) without the intermediate overflowing
    word_count / 10 * 13 + (word_count % 10) * 13 / 10
}

/// Input budget derived from a tokens-per-minute limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenBudget {
    /// The TPM limit the budget was computed from.
    pub limit: u64,
    /// Tokens a single request may spend on input.
    pub safe_input_tokens: u64,
    /// Characters of source text that fit into `safe_input_tokens`.
    pub char_budget: usize,
}

impl TokenBudget {
    /// Compute the budget for a limit.
    ///
    /// `safe_input_tokens = floor(limit * safety_factor)` and
    /// `char_budget = floor(safe_input_tokens * chars_per_token)`.
    pub fn compute(limit: u64, safety_factor: f64, chars_per_token: f64) -> Self {
        let safe_input_tokens = (limit as f64 * safety_factor).floor() as u64;
        let char_budget = (safe_input_tokens as f64 * chars_per_token).floor() as usize;

        Self {
            limit,
            safe_input_tokens,
            char_budget,
        }
    }

    /// Whether a text of `word_count` words is estimated to fit in one request.
    pub fn fits_words(&self, word_count: usize) -> bool {
        estimate_tokens(word_count) as u64 <= self.safe_input_tokens
    }

    /// Whether the budget can hold a word of `len` characters.
    pub fn holds_word(&self, len: usize) -> bool {
        self.char_budget > 0 && len <= self.char_budget
    }
}
