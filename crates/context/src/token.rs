//! Token estimation and truncation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token, accurate
//! within ~10% for BPE tokenizers on English text. Estimates feed the
//! window and truncation budgets and the assembly logs; billing always
//! comes from the backend's reported usage, never from these numbers.
//!
//! Any replacement tokenizer must preserve monotonicity: more characters
//! never yields a lower estimate.

use copperclaw_core::message::Message;

/// Marker appended to any text cut down by [`truncate_to_tokens`].
pub const TRUNCATION_MARKER: &str = "\n[truncated]";

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Estimate tokens for a single message including per-message overhead.
///
/// Each message costs ~4 tokens of overhead for role name, delimiters,
/// and formatting markers in the API wire format.
pub fn estimate_message_tokens(message: &Message) -> usize {
    let overhead = 4;
    overhead + estimate_tokens(&message.content)
}

/// Cut `text` down so its estimate fits in `max_tokens`, appending
/// [`TRUNCATION_MARKER`]. Text already within budget is returned verbatim,
/// which makes the operation idempotent: truncating a truncated string is
/// a no-op.
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> String {
    let budget_chars = max_tokens * 4;
    if text.len() <= budget_chars {
        return text.to_string();
    }

    let mut cut = budget_chars.saturating_sub(TRUNCATION_MARKER.len());
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }

    let mut out = String::with_capacity(cut + TRUNCATION_MARKER.len());
    out.push_str(&text[..cut]);
    out.push_str(TRUNCATION_MARKER);
    out
}
