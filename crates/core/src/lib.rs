//! # Copperclaw Core
//!
//! Domain types, traits, and error definitions for the copperclaw assistant
//! core. This crate has **zero framework dependencies**: it defines the
//! conversation data model and the backend abstraction that all other
//! crates implement against.
//!
//! ## Design Philosophy
//!
//! The chat backend is defined as a trait here; implementations live with
//! their owners (HTTP clients, test mocks). All crates depend inward on
//! core, which keeps the dependency graph clean and makes every component
//! testable with stub backends.

pub mod backend;
pub mod error;
pub mod message;
pub mod scratchpad;
pub mod session;

// Re-export key types at crate root for ergonomics
pub use backend::{ChatBackend, ChatRequest, ChatResponse, ToolDefinition, Usage};
pub use error::{ChatError, Error, Result, SessionError};
pub use message::{Message, Role, ToolCallRequest};
pub use scratchpad::Scratchpad;
pub use session::{Session, SessionKey};
