//! Agent configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for [`crate::Agent`].
///
/// Built with a fluent builder; every field has a usable default except the
/// API key, which typically comes from `OPENROUTER_API_KEY`.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// OpenRouter API key.
    pub api_key: String,
    /// Model identifier sent to the provider.
    pub model: String,
    /// Directory holding conversation documents and the index.
    pub conversation_dir: PathBuf,
    /// Roots that filesystem tools may touch.
    pub allowed_paths: Vec<PathBuf>,
    /// Whether dangerous commands should require confirmation instead of an
    /// outright block. Declared for configuration compatibility; the shell
    /// tool currently blocks unconditionally.
    pub dangerous_commands_require_confirmation: bool,
    /// Per-turn output token cap sent to the provider.
    pub max_tokens: u32,
    /// SerpApi key for web search; search reports itself unconfigured when
    /// empty.
    pub serp_api_key: String,
    /// Maximum tool rounds before a chat is abandoned with an error.
    pub max_tool_rounds: usize,
    /// Wall-clock limit for a single shell command.
    pub shell_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let mut allowed_paths = vec![cwd.clone()];
        if let Some(home) = dirs::home_dir() {
            allowed_paths.push(home);
        }
        Self {
            api_key: std::env::var("OPENROUTER_API_KEY").unwrap_or_default(),
            model: "google/gemini-2.5-pro".to_string(),
            conversation_dir: cwd.join(".convo"),
            allowed_paths,
            dangerous_commands_require_confirmation: true,
            max_tokens: 4000,
            serp_api_key: std::env::var("SERP_API_KEY").unwrap_or_default(),
            max_tool_rounds: 25,
            shell_timeout: Duration::from_secs(30),
        }
    }
}

impl AgentConfig {
    /// Start from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Set the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the conversation storage directory.
    #[must_use]
    pub fn with_conversation_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.conversation_dir = dir.into();
        self
    }

    /// Replace the allowed filesystem roots.
    #[must_use]
    pub fn with_allowed_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.allowed_paths = paths;
        self
    }

    /// Set the per-turn token cap.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the SerpApi key.
    #[must_use]
    pub fn with_serp_api_key(mut self, key: impl Into<String>) -> Self {
        self.serp_api_key = key.into();
        self
    }

    /// Set the tool-round cap.
    #[must_use]
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    /// Set the shell command timeout.
    #[must_use]
    pub fn with_shell_timeout(mut self, timeout: Duration) -> Self {
        self.shell_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.model, "google/gemini-2.5-pro");
        assert_eq!(config.max_tokens, 4000);
        assert_eq!(config.max_tool_rounds, 25);
        assert_eq!(config.shell_timeout, Duration::from_secs(30));
        assert!(config.conversation_dir.ends_with(".convo"));
        assert!(!config.allowed_paths.is_empty());
    }

    #[test]
    fn test_builder_chain() {
        let config = AgentConfig::new()
            .with_api_key("sk-test")
            .with_model("anthropic/claude-sonnet-4")
            .with_conversation_dir("/tmp/convo")
            .with_max_tokens(1024)
            .with_max_tool_rounds(5)
            .with_shell_timeout(Duration::from_secs(5));
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.model, "anthropic/claude-sonnet-4");
        assert_eq!(config.conversation_dir, PathBuf::from("/tmp/convo"));
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.max_tool_rounds, 5);
        assert_eq!(config.shell_timeout, Duration::from_secs(5));
    }
}
