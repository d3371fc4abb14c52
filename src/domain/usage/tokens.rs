//! Token counts used for billing

use serde::Serialize;

use crate::domain::llm::Usage;

/// Characters per token for the fallback heuristic
pub const CHARS_PER_TOKEN: u64 = 4;

/// Coarse token estimate for text without provider usage data
pub fn estimate_tokens(text: &str) -> u64 {
    let chars = text.chars().count() as u64;
    chars.div_ceil(CHARS_PER_TOKEN)
}

/// Billable token counts for one interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenCount {
    pub tokens_in: u64,
    pub tokens_out: u64,
    /// True when the counts came from the heuristic instead of the provider
    pub estimated: bool,
}

impl TokenCount {
    pub fn measured(tokens_in: u64, tokens_out: u64) -> Self {
        Self {
            tokens_in,
            tokens_out,
            estimated: false,
        }
    }

    /// Estimate each side independently from its text
    pub fn estimate(prompt_text: &str, completion_text: &str) -> Self {
        Self {
            tokens_in: estimate_tokens(prompt_text),
            tokens_out: estimate_tokens(completion_text),
            estimated: true,
        }
    }

    /// Prefer provider usage, falling back to the heuristic
    pub fn resolve(usage: Option<&Usage>, prompt_text: &str, completion_text: &str) -> Self {
        match usage {
            Some(usage) => Self::measured(
                u64::from(usage.prompt_tokens),
                u64::from(usage.completion_tokens),
            ),
            None => Self::estimate(prompt_text, completion_text),
        }
    }

    pub fn total(&self) -> u64 {
        self.tokens_in + self.tokens_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_estimate_counts_chars_not_bytes() {
        assert_eq!(estimate_tokens("ação"), 1);
    }

    #[test]
    fn test_resolve_prefers_usage() {
        let usage = Usage::new(1000, 500);
        let count = TokenCount::resolve(Some(&usage), "ignored", "ignored");

        assert_eq!(count, TokenCount::measured(1000, 500));
        assert_eq!(count.total(), 1500);
    }

    #[test]
    fn test_resolve_estimates_each_side() {
        let count = TokenCount::resolve(None, &"x".repeat(40), &"y".repeat(9));

        assert!(count.estimated);
        assert_eq!(count.tokens_in, 10);
        assert_eq!(count.tokens_out, 3);
    }
}
