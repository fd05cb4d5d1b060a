//! Context curation for copperclaw.
//!
//! Decides exactly what slice of a session is sent to a backend each turn:
//!
//! | Step | Source | Bound |
//! |------|--------|-------|
//! | 1. System prompt | persona renderer, rebuilt every call | never trimmed |
//! | 2. Scratchpad | session task state | rendered whole |
//! | 3. Rolling summary | prior compressions | summary token budget |
//! | 4. Recent history | last K messages, pairing-repaired | per-tool-output budget |
//!
//! The pairing repair in step 4 is the one correctness-critical algorithm
//! here: a tool result may only travel with its originating assistant
//! tool-call message, and every included tool call needs its result. The
//! backend API rejects prompts that violate this, so the window grows or
//! sheds messages until the invariant holds.
//!
//! The compression policy decides when the retained history has outgrown
//! the window and folds an externally produced summary back into the
//! session.

pub mod assembler;
pub mod compression;
pub mod token;

pub use assembler::{ContextAssembler, ContextConfig, StaticSystemPrompt, SystemPromptSource};
pub use compression::CompressionPolicy;
pub use token::{TRUNCATION_MARKER, estimate_message_tokens, estimate_tokens, truncate_to_tokens};
