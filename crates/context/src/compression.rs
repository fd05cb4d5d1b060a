//! Compression policy: when to fold old history into the rolling summary.
//!
//! The policy only decides and applies; producing the summary text is the
//! caller's job (normally a summarization call through the same backend
//! plumbing). Applying is atomic on the session: the retained suffix and
//! the new summary change together, so a crash between the two cannot
//! leave a session that double-counts or loses history.

use crate::assembler::ContextConfig;
use crate::token;
use copperclaw_core::message::Message;
use copperclaw_core::session::Session;
use tracing::info;

/// Decides when a session's history has outgrown its window and folds an
/// externally produced summary back in.
#[derive(Debug, Clone)]
pub struct CompressionPolicy {
    history_window: usize,
    summary_token_budget: usize,
}

impl CompressionPolicy {
    pub fn new(config: &ContextConfig) -> Self {
        Self {
            history_window: config.history_window,
            summary_token_budget: config.summary_token_budget,
        }
    }

    /// True once the history holds more than twice the window: at that
    /// point at least a full window's worth of messages can be folded
    /// away without touching anything the assembler would send.
    pub fn needs_compression(&self, session: &Session) -> bool {
        session.messages.len() > 2 * self.history_window
    }

    /// The prefix to summarize: everything except the last-window suffix.
    /// Empty when there is nothing to fold.
    pub fn messages_for_compression<'a>(&self, session: &'a Session) -> &'a [Message] {
        let len = session.messages.len();
        if len <= self.history_window {
            return &[];
        }
        &session.messages[..len - self.history_window]
    }

    /// Replace the summarized prefix with `new_summary` (truncated to the
    /// summary budget) and keep only the last-window suffix. No-op when
    /// the history already fits the window. Returns whether anything
    /// changed.
    pub fn apply_compression(&self, session: &mut Session, new_summary: &str) -> bool {
        let len = session.messages.len();
        if len <= self.history_window {
            return false;
        }

        let summary = token::truncate_to_tokens(new_summary, self.summary_token_budget);
        session.compress_to(self.history_window, summary);

        info!(
            session = %session.key,
            folded = len - self.history_window,
            retained = session.messages.len(),
            summary_tokens_est = token::estimate_tokens(&session.memory_summary),
            "Compressed session history"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copperclaw_core::session::SessionKey;

    fn policy(window: usize) -> CompressionPolicy {
        CompressionPolicy::new(&ContextConfig {
            history_window: window,
            ..ContextConfig::default()
        })
    }

    fn session_with(n: usize) -> Session {
        let mut session = Session::new(SessionKey::new("cli", "local"));
        for i in 0..n {
            session.push(Message::user(format!("msg {}", i)));
        }
        session
    }

    #[test]
    fn triggers_only_past_twice_the_window() {
        let policy = policy(10);
        assert!(!policy.needs_compression(&session_with(10)));
        assert!(!policy.needs_compression(&session_with(20)));
        assert!(policy.needs_compression(&session_with(21)));
    }

    #[test]
    fn compression_input_is_all_but_the_suffix() {
        let policy = policy(10);
        let session = session_with(25);

        let prefix = policy.messages_for_compression(&session);
        assert_eq!(prefix.len(), 15);
        assert_eq!(prefix[0].content, "msg 0");
        assert_eq!(prefix[14].content, "msg 14");
    }

    #[test]
    fn nothing_to_compress_on_short_history() {
        let policy = policy(10);
        assert!(policy.messages_for_compression(&session_with(7)).is_empty());
    }

    #[test]
    fn apply_keeps_suffix_and_sets_summary() {
        let policy = policy(10);
        let mut session = session_with(25);

        assert!(policy.apply_compression(&mut session, "the early conversation"));
        assert_eq!(session.messages.len(), 10);
        assert_eq!(session.messages[0].content, "msg 15");
        assert_eq!(session.memory_summary, "the early conversation");
    }

    #[test]
    fn apply_is_noop_on_short_history() {
        let policy = policy(10);
        let mut session = session_with(4);

        assert!(!policy.apply_compression(&mut session, "should not land"));
        assert_eq!(session.messages.len(), 4);
        assert!(session.memory_summary.is_empty());
    }

    #[test]
    fn reapplying_after_compression_is_noop() {
        let policy = policy(10);
        let mut session = session_with(25);

        assert!(policy.apply_compression(&mut session, "first pass"));
        assert!(!policy.apply_compression(&mut session, "second pass"));
        assert_eq!(session.messages.len(), 10);
        assert_eq!(session.memory_summary, "first pass");
    }

    #[test]
    fn retained_length_is_min_of_window_and_previous() {
        for n in [3usize, 10, 11, 40] {
            let policy = policy(10);
            let mut session = session_with(n);
            policy.apply_compression(&mut session, "s");
            assert_eq!(session.messages.len(), n.min(10));
        }
    }

    #[test]
    fn oversized_summary_is_truncated() {
        let policy = policy(2);
        let mut session = session_with(5);

        let huge = "recap ".repeat(2000);
        policy.apply_compression(&mut session, &huge);
        assert!(session.memory_summary.ends_with(token::TRUNCATION_MARKER));
        assert!(token::estimate_tokens(&session.memory_summary) <= 800);
    }
}
