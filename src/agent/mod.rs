//! The multi-turn chat orchestrator.
//!
//! One [`Agent::chat`] call drives the whole loop: load-or-create the
//! conversation, seed the system preamble, stream model turns, execute
//! requested tools, feed results back, and persist the transcript once the
//! model stops asking for tools. Progress is published as [`AgentEvent`]s so
//! presentation layers can render text as it streams.

pub mod config;
pub mod error;
pub mod events;
pub mod prompt;

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::llm::{ModelProvider, ModelRequest, OpenRouterProvider, ToolInvocation};
use crate::safety::SafetyPolicy;
use crate::storage::{
    normalize_message, ConversationMetadata, ConversationStore, ConversationSummary, Message, Role,
};
use crate::tools::ToolRegistry;

pub use config::AgentConfig;
pub use error::{AgentError, AgentResult};
pub use events::{AgentEvent, EventBus};
pub use prompt::SYSTEM_PROMPT;

/// What a completed chat hands back to the caller.
#[derive(Clone, Debug)]
pub struct ChatOutcome {
    /// Id of the conversation the chat ran in (fresh for new conversations).
    pub conversation_id: String,
    /// Assistant text accumulated across every model turn of this chat.
    pub text: String,
    /// Tool invocations made during this chat, in execution order.
    pub tool_calls: Vec<ToolInvocation>,
    /// Metadata as persisted at completion.
    pub metadata: ConversationMetadata,
}

/// The agent core: model loop, guarded tools, durable conversations.
pub struct Agent {
    config: AgentConfig,
    store: ConversationStore,
    registry: ToolRegistry,
    provider: Box<dyn ModelProvider>,
    bus: Arc<Mutex<EventBus>>,
    /// Per-conversation write locks; chats on the same id run one at a time.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Agent {
    /// Build an agent backed by the OpenRouter provider.
    ///
    /// # Errors
    /// [`AgentError::Provider`] if the HTTP client cannot be constructed.
    pub fn new(config: AgentConfig) -> AgentResult<Self> {
        let provider = OpenRouterProvider::new(config.api_key.clone())?;
        Ok(Self::with_provider(config, Box::new(provider)))
    }

    /// Build an agent with an explicit provider. Used by tests and embedders
    /// that bring their own backend.
    #[must_use]
    pub fn with_provider(config: AgentConfig, provider: Box<dyn ModelProvider>) -> Self {
        let policy = Arc::new(SafetyPolicy::new(
            &config.allowed_paths,
            config
                .allowed_paths
                .first()
                .cloned()
                .unwrap_or_else(|| std::path::PathBuf::from(".")),
        ));
        let registry = ToolRegistry::standard(
            policy,
            config.shell_timeout,
            config.serp_api_key.clone(),
        );
        let store = ConversationStore::new(config.conversation_dir.clone());
        Self {
            config,
            store,
            registry,
            provider,
            bus: Arc::new(Mutex::new(EventBus::new())),
            locks: DashMap::new(),
        }
    }

    /// Subscribe to progress events for all chats run by this agent.
    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<AgentEvent> {
        self.bus.lock().await.subscribe()
    }

    /// Run one chat: append the user message, loop the model with tools until
    /// it answers without requesting any, persist, and return the outcome.
    ///
    /// # Errors
    /// Provider, store and round-cap failures. Tool failures never surface
    /// here; they are reported inside the transcript.
    #[instrument(skip(self, message), fields(conversation = conversation_id.unwrap_or("<new>")))]
    pub async fn chat(
        &self,
        message: &str,
        conversation_id: Option<&str>,
    ) -> AgentResult<ChatOutcome> {
        match self.run_chat(message, conversation_id).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.publish(AgentEvent::Error(err.to_string())).await;
                Err(err)
            }
        }
    }

    async fn run_chat(
        &self,
        message: &str,
        conversation_id: Option<&str>,
    ) -> AgentResult<ChatOutcome> {
        // The per-id lock must be held before the document is read, or two
        // chats on the same id would both load the old transcript and the
        // later save would drop the earlier one's messages.
        let (mut conversation, _guard) = match conversation_id {
            Some(requested) => {
                let guard = self.lock_for(requested).await;
                let conversation = self.store.get_or_create(Some(requested)).await?;
                if conversation.id == requested {
                    (conversation, guard)
                } else {
                    // The requested id had no document, so a fresh id was
                    // issued; nothing else can be writing under it yet.
                    drop(guard);
                    let guard = self.lock_for(&conversation.id).await;
                    (conversation, guard)
                }
            }
            None => {
                let conversation = self.store.get_or_create(None).await?;
                let guard = self.lock_for(&conversation.id).await;
                (conversation, guard)
            }
        };
        let id = conversation.id.clone();

        if conversation.messages.is_empty() {
            conversation
                .messages
                .push(Message::text(Role::System, SYSTEM_PROMPT));
            conversation.model = self.config.model.clone();
        }
        conversation.messages.push(Message::text(Role::User, message));

        let schemas = self.registry.schemas();
        let mut rounds = 0usize;
        let mut final_text = String::new();
        let mut tool_calls_made = Vec::new();

        loop {
            let (delta_tx, delta_rx) = mpsc::unbounded_channel();
            let forwarder = self.spawn_delta_forwarder(delta_rx);
            let turn = self
                .provider
                .stream_turn(
                    ModelRequest {
                        model: &conversation.model,
                        max_tokens: self.config.max_tokens,
                        messages: &conversation.messages,
                        tools: &schemas,
                    },
                    delta_tx,
                )
                .await;
            // Flush pending deltas before tool events so ordering holds.
            let _ = forwarder.await;
            let turn = turn?;

            for raw in &turn.messages {
                if let Some(normalized) = normalize_message(raw.role, &raw.blocks) {
                    conversation.messages.push(normalized);
                }
            }
            final_text.push_str(&turn.text);

            if turn.tool_calls.is_empty() {
                break;
            }
            rounds += 1;
            if rounds > self.config.max_tool_rounds {
                return Err(AgentError::TooManyToolRounds(self.config.max_tool_rounds));
            }
            debug!(round = rounds, calls = turn.tool_calls.len(), "tool round");

            for call in &turn.tool_calls {
                self.publish(AgentEvent::ToolCallStart {
                    tool_name: call.tool_name.clone(),
                    args: call.args.clone(),
                })
                .await;

                let output = self.registry.execute(&call.tool_name, &call.args).await;
                conversation
                    .messages
                    .push(Message::tool_result(&call.call_id, output));
                conversation
                    .metadata
                    .tools_used
                    .insert(call.tool_name.clone());
                tool_calls_made.push(call.clone());

                self.publish(AgentEvent::ToolCallComplete {
                    tool_name: call.tool_name.clone(),
                })
                .await;
            }
        }

        conversation.updated = Utc::now();
        self.store.save(&conversation).await?;
        info!(
            conversation = %id,
            rounds,
            tools = tool_calls_made.len(),
            "chat complete"
        );

        self.publish(AgentEvent::Complete {
            conversation_id: id.clone(),
            metadata: conversation.metadata.clone(),
        })
        .await;

        Ok(ChatOutcome {
            conversation_id: id,
            text: final_text,
            tool_calls: tool_calls_made,
            metadata: conversation.metadata,
        })
    }

    /// List stored conversations, most recently updated first.
    ///
    /// # Errors
    /// Store failures.
    pub async fn list_conversations(&self) -> AgentResult<Vec<ConversationSummary>> {
        Ok(self.store.list().await?)
    }

    /// Delete a conversation document and its index entry.
    ///
    /// # Errors
    /// Store failures; deleting an unknown id is not an error.
    pub async fn delete_conversation(&self, id: &str) -> AgentResult<()> {
        // Wait for any in-flight chat on this id. The map entry stays; a
        // removed entry would let a later chat race a holder of the old lock.
        let _guard = self.lock_for(id).await;
        self.store.delete(id).await?;
        Ok(())
    }

    /// Take the per-id chat lock, owned so the guard outlives the map access.
    async fn lock_for(&self, id: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = self.locks.entry(id.to_string()).or_default().clone();
        lock.lock_owned().await
    }

    async fn publish(&self, event: AgentEvent) {
        self.bus.lock().await.publish(&event);
    }

    fn spawn_delta_forwarder(
        &self,
        mut deltas: mpsc::UnboundedReceiver<String>,
    ) -> JoinHandle<()> {
        let bus = Arc::clone(&self.bus);
        tokio::spawn(async move {
            while let Some(delta) = deltas.recv().await {
                bus.lock().await.publish(&AgentEvent::TextDelta(delta));
            }
        })
    }
}
