//! Error taxonomy for the agent core.
//!
//! Only failures of the loop itself surface here. Tool execution failures are
//! never errors: they are reported as descriptive strings inside the
//! transcript so the model can react to them.

use thiserror::Error;

use crate::storage::StoreError;

/// Errors surfaced by [`crate::Agent`] operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The provider rejected our credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The provider could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The provider did not answer in time.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// A conversation id was given but no document could be loaded for it.
    #[error("Conversation {0} not found")]
    ConversationNotFound(String),

    /// The tool loop exceeded its round cap without the model finishing.
    #[error("tool loop exceeded {0} rounds without completing")]
    TooManyToolRounds(usize),

    /// The conversation store failed.
    #[error(transparent)]
    Store(StoreError),

    /// The provider returned something we could not make sense of.
    #[error("provider error: {0}")]
    Provider(String),
}

impl From<StoreError> for AgentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => AgentError::ConversationNotFound(id),
            other => AgentError::Store(other),
        }
    }
}

/// Result alias for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;
