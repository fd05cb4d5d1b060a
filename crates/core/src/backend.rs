//! ChatBackend trait: the abstraction over LLM backends.
//!
//! A backend knows how to send an assembled prompt to one model endpoint
//! and return a response. The fallback router holds several of these and
//! walks them in order; it never cares which concrete implementation is
//! behind the trait.

use crate::error::ChatError;
use crate::message::{Message, ToolCallRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One chat call, ready for the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The model to use (e.g. "anthropic/claude-sonnet-4")
    pub model: String,

    /// The assembled prompt messages
    pub messages: Vec<Message>,

    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A complete response from a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The generated message
    pub message: Message,

    /// Token usage statistics, if the backend reports them
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

impl ChatResponse {
    /// Convenience constructor for a plain assistant text reply.
    pub fn text(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            message: Message::assistant(content),
            usage: None,
            model: model.into(),
        }
    }

    /// Tool calls requested by the response, if any.
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        &self.message.tool_calls
    }
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The chat capability every backend implements.
///
/// Implementations must be cheap to call repeatedly and must surface
/// failures as [`ChatError`]; the error's display text is what the
/// classifier inspects to decide whether falling back is worthwhile.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// A human-readable backend ID (e.g. "openrouter", "anthropic").
    fn id(&self) -> &str;

    /// Send a request and get a complete response.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError>;
}
