//! Session: one conversation's durable state.
//!
//! A session holds the append-ordered message history, the rolling summary
//! produced by compression, and the optional task scratchpad. Messages are
//! only ever removed as a contiguous prefix (by compression), never
//! reordered; `compress_to` performs that removal and the summary update
//! as one atomic mutation.

use crate::message::Message;
use crate::scratchpad::Scratchpad;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a conversation: which channel it arrived on and who
/// is talking. Both parts are immutable for the session's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    /// Channel name (e.g. "telegram", "cli", "web")
    pub channel: String,

    /// Platform-specific sender ID within that channel
    pub sender_id: String,
}

impl SessionKey {
    pub fn new(channel: impl Into<String>, sender_id: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            sender_id: sender_id.into(),
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.channel, self.sender_id)
    }
}

/// One conversation's state: history, rolling summary, scratchpad.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Stable, opaque session ID
    pub id: String,

    /// Channel + sender identity (immutable)
    pub key: SessionKey,

    /// Append-ordered message history. Compression removes a contiguous
    /// prefix; nothing else mutates this ordering.
    pub messages: Vec<Message>,

    /// Rolling summary of compressed-away history. Empty until the first
    /// compression.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memory_summary: String,

    /// Optional multi-step task state, independent of the history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratchpad: Option<Scratchpad>,

    /// Total messages ever appended (monotonic; survives compression).
    pub message_count: u64,

    /// When this session was created
    pub created_at: DateTime<Utc>,

    /// When the last message was appended
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    /// Create a new empty session for the given identity.
    pub fn new(key: SessionKey) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            key,
            messages: Vec::new(),
            memory_summary: String::new(),
            scratchpad: None,
            message_count: 0,
            created_at: now,
            last_active_at: now,
        }
    }

    /// Append a message and bump the activity metadata.
    pub fn push(&mut self, message: Message) {
        self.message_count += 1;
        self.last_active_at = Utc::now();
        self.messages.push(message);
    }

    /// Atomically replace the history with its last-`keep_last` suffix and
    /// set the rolling summary. `message_count` is untouched: it counts
    /// appends, not retained messages.
    pub fn compress_to(&mut self, keep_last: usize, summary: impl Into<String>) {
        let len = self.messages.len();
        if len > keep_last {
            self.messages.drain(..len - keep_last);
        }
        self.memory_summary = summary.into();
    }

    /// Access the scratchpad, creating it on first use.
    pub fn scratchpad_mut(&mut self) -> &mut Scratchpad {
        self.scratchpad.get_or_insert_with(Scratchpad::new)
    }

    /// Rough token estimate for the retained history (4 chars per token).
    pub fn estimated_tokens(&self) -> usize {
        self.messages.iter().map(|m| m.content.len() / 4).sum()
    }
}
