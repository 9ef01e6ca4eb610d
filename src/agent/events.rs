//! Progress events published while a chat runs.
//!
//! Consumers subscribe with an unbounded channel; publication is fan-out and
//! best-effort. A consumer that dropped its receiver is pruned on the next
//! publish instead of failing the chat.

use serde_json::Value;
use tokio::sync::mpsc;

use crate::storage::ConversationMetadata;

/// One progress event emitted during [`crate::Agent::chat`].
#[derive(Clone, Debug, PartialEq)]
pub enum AgentEvent {
    /// An incremental chunk of assistant text.
    TextDelta(String),
    /// The model requested a tool invocation.
    ToolCallStart {
        /// Name of the tool being invoked.
        tool_name: String,
        /// Arguments the model supplied.
        args: Value,
    },
    /// A tool invocation finished and its result joined the transcript.
    ToolCallComplete {
        /// Name of the tool that finished.
        tool_name: String,
    },
    /// The chat finished successfully.
    Complete {
        /// Id of the conversation the chat ran in.
        conversation_id: String,
        /// Metadata as persisted at completion.
        metadata: ConversationMetadata,
    },
    /// The chat failed; carries the error's display form.
    Error(String),
}

/// Fan-out publisher for [`AgentEvent`]s.
#[derive(Debug, Default)]
pub struct EventBus {
    senders: Vec<mpsc::UnboundedSender<AgentEvent>>,
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber and return its receiving end.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<AgentEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber, pruning closed ones.
    pub fn publish(&mut self, event: &AgentEvent) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of live subscribers (after the last prune).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.senders.len()
    }
}
