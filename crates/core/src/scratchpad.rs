//! Scratchpad: structured multi-step task state carried by a session.
//!
//! The scratchpad tracks what a long-running task has already touched
//! (visited), what it has gathered (collected), what is still to do
//! (pending), and a free-form progress note. It lives alongside the message
//! history rather than inside it, so compression never erases task state.
//! The context assembler renders it into a system message each turn.

use serde::{Deserialize, Serialize};

/// In-session scratch state for a multi-step task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scratchpad {
    /// Items already processed (URLs, files, search queries, ...).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub visited: Vec<String>,

    /// Findings gathered so far.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collected: Vec<String>,

    /// Steps still to be taken.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending: Vec<String>,

    /// Free-form progress note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an item as visited.
    pub fn add_visited(&mut self, item: impl Into<String>) {
        self.visited.push(item.into());
    }

    /// Record a gathered finding.
    pub fn add_collected(&mut self, item: impl Into<String>) {
        self.collected.push(item.into());
    }

    /// Queue a step that still needs doing.
    pub fn add_pending(&mut self, item: impl Into<String>) {
        self.pending.push(item.into());
    }

    /// Remove a pending step once it has been handled.
    /// Returns `true` if the step was present.
    pub fn complete_pending(&mut self, item: &str) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p != item);
        self.pending.len() < before
    }

    /// Set the free-form progress note.
    pub fn set_progress(&mut self, note: impl Into<String>) {
        self.progress = Some(note.into());
    }

    /// Total number of items across all sections.
    pub fn item_count(&self) -> usize {
        let progress = usize::from(self.progress.is_some());
        self.visited.len() + self.collected.len() + self.pending.len() + progress
    }

    /// Whether there is anything worth rendering.
    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    /// Clear all scratch state (call when a task completes).
    pub fn clear(&mut self) {
        self.visited.clear();
        self.collected.clear();
        self.pending.clear();
        self.progress = None;
    }

    /// Render the scratchpad as a text section suitable for injection
    /// into the prompt.
    pub fn render(&self) -> String {
        let mut out = String::new();

        if !self.visited.is_empty() {
            out.push_str("## Visited\n");
            for item in &self.visited {
                out.push_str(&format!("- {}\n", item));
            }
        }

        if !self.collected.is_empty() {
            out.push_str("## Collected\n");
            for item in &self.collected {
                out.push_str(&format!("- {}\n", item));
            }
        }

        if !self.pending.is_empty() {
            out.push_str("## Pending\n");
            for item in &self.pending {
                out.push_str(&format!("- {}\n", item));
            }
        }

        if let Some(progress) = &self.progress {
            out.push_str(&format!("Progress: {}\n", progress));
        }

        out
    }
}
