//! Prompt assembly: Session in, ordered prompt messages out.
//!
//! Construction order is fixed:
//!
//! 1. Fresh system message (persona + tool names), rebuilt every call
//! 2. Scratchpad section, when the session carries task state
//! 3. Rolling summary section, truncated to its token budget
//! 4. The last K history messages, pairing-repaired, with each tool
//!    result independently truncated to the per-tool-output budget
//!
//! Step 4's truncation is the dominant cost-control lever: tool output is
//! unbounded (a scraped page, a file dump) while everything else in the
//! prompt is already size-limited.
//!
//! # Determinism
//!
//! Assembly is a pure function of the session and the rendered system
//! prompt. No caching, no time-dependent logic.

use crate::token;
use copperclaw_core::message::{Message, Role};
use copperclaw_core::session::Session;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

// ── Configuration ─────────────────────────────────────────────────────────

/// Budgets governing assembly and compression.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// How many recent history messages to send (K).
    pub history_window: usize,
    /// Token cap for the rolling-summary section.
    pub summary_token_budget: usize,
    /// Token cap applied to each tool result independently.
    pub tool_output_token_budget: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_window: 10,
            summary_token_budget: 800,
            tool_output_token_budget: 500,
        }
    }
}

// ── System prompt source ──────────────────────────────────────────────────

/// Renders the leading system message. Invoked fresh on every assembly so
/// persona edits, clock-dependent instructions, and tool changes take
/// effect on the very next turn.
pub trait SystemPromptSource: Send + Sync {
    fn render(&self, session: &Session) -> String;
}

/// A fixed persona plus the names of the available tools.
pub struct StaticSystemPrompt {
    persona: String,
    tool_names: Vec<String>,
}

impl StaticSystemPrompt {
    pub fn new(persona: impl Into<String>, tool_names: Vec<String>) -> Self {
        Self {
            persona: persona.into(),
            tool_names,
        }
    }
}

impl SystemPromptSource for StaticSystemPrompt {
    fn render(&self, _session: &Session) -> String {
        if self.tool_names.is_empty() {
            return self.persona.clone();
        }
        format!(
            "{}\n\nAvailable tools: {}",
            self.persona,
            self.tool_names.join(", ")
        )
    }
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// The context assembler. Stateless: create one and reuse it across
/// sessions and turns.
pub struct ContextAssembler {
    config: ContextConfig,
    prompt: Arc<dyn SystemPromptSource>,
}

impl ContextAssembler {
    pub fn new(config: ContextConfig, prompt: Arc<dyn SystemPromptSource>) -> Self {
        Self { config, prompt }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Assemble the prompt for one turn.
    pub fn build_context(&self, session: &Session) -> Vec<Message> {
        let mut messages = Vec::new();

        // 1. System prompt, never cached
        messages.push(Message::system(self.prompt.render(session)));

        // 2. Scratchpad
        if let Some(pad) = &session.scratchpad
            && !pad.is_empty()
        {
            messages.push(Message::system(format!("[Scratchpad]\n{}", pad.render())));
        }

        // 3. Rolling summary
        if !session.memory_summary.is_empty() {
            let summary = token::truncate_to_tokens(
                &session.memory_summary,
                self.config.summary_token_budget,
            );
            messages.push(Message::system(format!(
                "[Conversation Summary]\n{}",
                summary
            )));
        }

        // 4. Recent history, repaired and tool-truncated
        let repair = repair_window(&session.messages, self.config.history_window);
        for &idx in &repair.indices {
            let msg = &session.messages[idx];
            if msg.role == Role::Tool {
                let mut clipped = msg.clone();
                clipped.content = token::truncate_to_tokens(
                    &msg.content,
                    self.config.tool_output_token_budget,
                );
                messages.push(clipped);
            } else {
                messages.push(msg.clone());
            }
        }

        debug!(
            session = %session.key,
            history = session.messages.len(),
            window = repair.indices.len(),
            grown = repair.grown,
            orphans_dropped = repair.dropped_orphans,
            spliced = repair.spliced,
            prompt_tokens_est = messages.iter().map(token::estimate_message_tokens).sum::<usize>(),
            "Assembled context"
        );

        messages
    }
}

// ── Pairing repair ────────────────────────────────────────────────────────

struct RepairOutcome {
    /// Indices into the full history, ascending.
    indices: Vec<usize>,
    grown: usize,
    dropped_orphans: usize,
    spliced: usize,
}

/// Select the last `window` messages and repair tool-call pairing.
///
/// Leading orphan: while the window starts with a tool result, pull in its
/// immediate predecessor when that is a tool-calling assistant message;
/// otherwise the result has lost its parent for good and is dropped.
///
/// Trailing gap: for every tool-calling assistant message in the window,
/// any call id without a matching in-window result is searched for in the
/// run of consecutive tool messages following the assistant in the full
/// history, and matches are spliced back in at their history position.
///
/// Never fails; terminates because the history is finite.
fn repair_window(history: &[Message], window: usize) -> RepairOutcome {
    let len = history.len();
    let mut front: VecDeque<usize> = (len.saturating_sub(window)..len).collect();
    let mut grown = 0;
    let mut dropped_orphans = 0;

    while let Some(&first) = front.front() {
        if history[first].role != Role::Tool {
            break;
        }
        match first.checked_sub(1) {
            Some(pred) if history[pred].has_tool_calls() => {
                front.push_front(pred);
                grown += 1;
            }
            _ => {
                front.pop_front();
                dropped_orphans += 1;
            }
        }
    }

    let mut indices: Vec<usize> = front.into();
    let mut spliced = 0;

    for idx in indices.clone() {
        let msg = &history[idx];
        if !msg.has_tool_calls() {
            continue;
        }

        let in_window: HashSet<&str> = indices
            .iter()
            .map(|&i| &history[i])
            .filter(|m| m.role == Role::Tool)
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        let missing: HashSet<&str> = msg
            .tool_calls
            .iter()
            .map(|c| c.id.as_str())
            .filter(|id| !in_window.contains(id))
            .collect();
        if missing.is_empty() {
            continue;
        }

        // Results live in the run of tool messages directly after the
        // assistant; stop at the first non-tool message.
        let mut j = idx + 1;
        while j < len && history[j].role == Role::Tool {
            if history[j]
                .tool_call_id
                .as_deref()
                .is_some_and(|id| missing.contains(id))
                && let Err(pos) = indices.binary_search(&j)
            {
                indices.insert(pos, j);
                spliced += 1;
            }
            j += 1;
        }
    }

    RepairOutcome {
        indices,
        grown,
        dropped_orphans,
        spliced,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
