//! Failure classification: raw backend error to `{kind, retryable}`.
//!
//! Classification is deterministic and stateless: it looks only at the
//! lower-cased display text of the error, never at backend state. Match
//! terms are checked in a fixed priority order because the categories
//! overlap; "401 Unauthorized: quota check failed" must classify as an
//! auth failure, not a billing one, since no amount of falling back fixes
//! a bad key.

use copperclaw_core::error::ChatError;
use serde::{Deserialize, Serialize};

/// The normalized failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Auth,
    RateLimit,
    Timeout,
    ContextOverflow,
    Billing,
    Unknown,
}

impl ErrorKind {
    /// Whether a failure of this kind is worth retrying on another
    /// backend. Auth and context-overflow failures are structural: they
    /// recur on every candidate, so the fallback loop aborts on them.
    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::Auth | Self::ContextOverflow)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Auth => "auth",
            Self::RateLimit => "rate-limit",
            Self::Timeout => "timeout",
            Self::ContextOverflow => "context-overflow",
            Self::Billing => "billing",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A classified backend failure: one immutable judgment per raw error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
    pub provider_id: String,
}

impl std::fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.provider_id, self.message)
    }
}

impl std::error::Error for ClassifiedError {}

/// Classify a raw backend failure.
pub fn classify_error(error: &ChatError, provider_id: &str) -> ClassifiedError {
    let message = error.to_string();
    let kind = kind_of(&message.to_lowercase());
    ClassifiedError {
        kind,
        retryable: kind.is_retryable(),
        message,
        provider_id: provider_id.to_string(),
    }
}

/// First match wins; order matters.
fn kind_of(text: &str) -> ErrorKind {
    const AUTH: [&str; 4] = ["401", "unauthorized", "invalid api key", "authentication"];
    const RATE_LIMIT: [&str; 3] = ["429", "rate limit", "too many requests"];
    const TIMEOUT: [&str; 3] = ["timeout", "etimedout", "econnreset"];
    const BILLING: [&str; 4] = ["quota", "billing", "insufficient", "exceeded"];

    let any = |terms: &[&str]| terms.iter().any(|t| text.contains(t));

    if any(&AUTH) {
        ErrorKind::Auth
    } else if any(&RATE_LIMIT) {
        ErrorKind::RateLimit
    } else if any(&TIMEOUT) {
        ErrorKind::Timeout
    } else if text.contains("context") && (text.contains("too long") || text.contains("maximum")) {
        ErrorKind::ContextOverflow
    } else if any(&BILLING) {
        ErrorKind::Billing
    } else {
        ErrorKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_text(text: &str) -> ClassifiedError {
        classify_error(&ChatError::Network(text.into()), "test-provider")
    }

    #[test]
    fn auth_failures_are_terminal() {
        for text in ["401 from upstream", "Unauthorized", "invalid api key supplied"] {
            let classified = classify_text(text);
            assert_eq!(classified.kind, ErrorKind::Auth, "{text}");
            assert!(!classified.retryable);
        }
    }

    #[test]
    fn rate_limits_are_retryable() {
        let classified = classify_text("429: too many requests");
        assert_eq!(classified.kind, ErrorKind::RateLimit);
        assert!(classified.retryable);
    }

    #[test]
    fn timeouts_are_retryable() {
        for text in ["connect ETIMEDOUT 1.2.3.4", "read ECONNRESET", "request timeout"] {
            let classified = classify_text(text);
            assert_eq!(classified.kind, ErrorKind::Timeout, "{text}");
            assert!(classified.retryable);
        }
    }

    #[test]
    fn context_overflow_needs_both_terms() {
        let overflow = classify_text("prompt context is too long for this model");
        assert_eq!(overflow.kind, ErrorKind::ContextOverflow);
        assert!(!overflow.retryable);

        let maximum = classify_text("context exceeds the maximum of 200000 tokens");
        assert_eq!(maximum.kind, ErrorKind::ContextOverflow);

        // "context" alone is not enough to call it an overflow
        let vague = classify_text("failed to decode context frame");
        assert_eq!(vague.kind, ErrorKind::Unknown);
    }

    #[test]
    fn billing_failures_still_fall_back() {
        let classified = classify_text("monthly spending cap insufficient");
        assert_eq!(classified.kind, ErrorKind::Billing);
        assert!(classified.retryable);
    }

    #[test]
    fn unmatched_text_defaults_to_unknown_retryable() {
        let classified = classify_text("the server caught fire");
        assert_eq!(classified.kind, ErrorKind::Unknown);
        assert!(classified.retryable);
    }

    #[test]
    fn auth_outranks_billing_on_overlap() {
        // Matches both "401" and "exceeded"; priority order decides.
        let classified = classify_text("401: request quota exceeded");
        assert_eq!(classified.kind, ErrorKind::Auth);
        assert!(!classified.retryable);
    }

    #[test]
    fn rate_limit_outranks_billing() {
        let classified = classify_text("rate limit exceeded");
        assert_eq!(classified.kind, ErrorKind::RateLimit);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let classified = classify_text("RATE LIMIT REACHED");
        assert_eq!(classified.kind, ErrorKind::RateLimit);
    }

    #[test]
    fn classification_keeps_provider_and_text() {
        let classified = classify_error(
            &ChatError::Api {
                status_code: 500,
                message: "internal error".into(),
            },
            "openrouter",
        );
        assert_eq!(classified.provider_id, "openrouter");
        assert!(classified.message.contains("internal error"));
        assert!(classified.to_string().contains("openrouter"));
    }

    #[test]
    fn structured_chat_errors_classify_through_display() {
        let auth = classify_error(&ChatError::AuthenticationFailed("bad key".into()), "p");
        assert_eq!(auth.kind, ErrorKind::Auth);

        let rate = classify_error(&ChatError::RateLimited { retry_after_secs: 30 }, "p");
        assert_eq!(rate.kind, ErrorKind::RateLimit);

        let timeout = classify_error(&ChatError::Timeout("no response after 30s".into()), "p");
        assert_eq!(timeout.kind, ErrorKind::Timeout);

        let overflow = classify_error(&ChatError::ContextOverflow("200k limit".into()), "p");
        assert_eq!(overflow.kind, ErrorKind::ContextOverflow);

        let quota = classify_error(&ChatError::QuotaExhausted("plan cap".into()), "p");
        assert_eq!(quota.kind, ErrorKind::Billing);
    }
}
