//! Model provider abstraction.
//!
//! The orchestrator only knows [`ModelProvider`]: one streamed round-trip in,
//! one [`ModelTurn`] out. The production implementation lives in
//! [`openrouter`]; tests drive the loop with scripted providers.

pub mod openrouter;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::agent::error::AgentResult;
use crate::storage::{Message, Role};

pub use openrouter::OpenRouterProvider;

/// One model round-trip request.
#[derive(Debug)]
pub struct ModelRequest<'a> {
    /// Model identifier.
    pub model: &'a str,
    /// Output token cap for this turn.
    pub max_tokens: u32,
    /// Full transcript so far, oldest first.
    pub messages: &'a [Message],
    /// Tool schemas advertised to the model.
    pub tools: &'a [Value],
}

/// A tool invocation the model asked for.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolInvocation {
    /// Provider-assigned call id (synthesized if the provider omits one).
    pub call_id: String,
    /// Requested tool name.
    pub tool_name: String,
    /// Arguments as a JSON object.
    pub args: Value,
}

/// A provider message before normalization: a role plus raw content blocks in
/// wire form. Unknown block tags and provider side-channel fields are removed
/// later by [`crate::storage::normalize_message`].
#[derive(Clone, Debug)]
pub struct RawMessage {
    /// Message role.
    pub role: Role,
    /// Raw wire-format content blocks.
    pub blocks: Vec<Value>,
}

/// Result of one streamed model round-trip.
#[derive(Clone, Debug, Default)]
pub struct ModelTurn {
    /// Assistant text accumulated over the stream.
    pub text: String,
    /// Tool invocations requested this turn, in request order. Empty means
    /// the model considers the turn final.
    pub tool_calls: Vec<ToolInvocation>,
    /// Messages to append to the transcript, pre-normalization.
    pub messages: Vec<RawMessage>,
}

/// A streaming chat-completion backend.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Run one round-trip, pushing text deltas into `deltas` as they arrive.
    /// The channel closing must not fail the turn.
    async fn stream_turn(
        &self,
        request: ModelRequest<'_>,
        deltas: mpsc::UnboundedSender<String>,
    ) -> AgentResult<ModelTurn>;
}
