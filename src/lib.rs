//! Deskpilot: the agent core behind a conversational OS assistant.
//!
//! The crate wires four pieces together: a model provider that streams
//! assistant turns, a registry of guarded tools (filesystem, shell, web), a
//! safety policy that gates every path and command the model asks for, and a
//! durable conversation store. The [`agent::Agent`] orchestrator drives the
//! multi-turn loop and publishes progress events; presentation layers (CLI,
//! desktop shell) only consume those events and call `chat`,
//! `list_conversations` and `delete_conversation`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(unused_must_use)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Agent orchestrator, configuration, events and error taxonomy.
pub mod agent;
/// Model provider abstraction and the OpenRouter implementation.
pub mod llm;
/// Path allow-list and dangerous-command policy.
pub mod safety;
/// Durable conversation documents and the summary index.
pub mod storage;
/// The fixed tool set exposed to the model.
pub mod tools;

pub use agent::{Agent, AgentConfig, AgentError, AgentEvent, ChatOutcome};
