//! The fixed tool set exposed to the model.
//!
//! Tool execution is infallible by contract: every failure mode (denied path,
//! missing file, timeout, bad arguments) becomes a descriptive string handed
//! back to the model as the tool result, never an error that aborts the chat.

pub mod filesystem;
pub mod shell;
pub mod web;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::safety::SafetyPolicy;

/// A single tool callable by the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Wire name of the tool (camelCase, stable).
    fn name(&self) -> &'static str;

    /// One-line description shown to the model.
    fn description(&self) -> &'static str;

    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value;

    /// Run the tool. Always returns a result string, never fails the chat.
    async fn execute(&self, args: &Value) -> String;
}

/// The set of tools advertised to the model for every turn.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Build the standard registry: filesystem, shell and web tools, all
    /// sharing one safety policy.
    #[must_use]
    pub fn standard(
        policy: Arc<SafetyPolicy>,
        shell_timeout: Duration,
        serp_api_key: String,
    ) -> Self {
        let http = reqwest::Client::new();
        let tools: Vec<Box<dyn Tool>> = vec![
            Box::new(filesystem::ReadFile::new(Arc::clone(&policy))),
            Box::new(filesystem::WriteFile::new(Arc::clone(&policy))),
            Box::new(filesystem::ListDirectory::new(Arc::clone(&policy))),
            Box::new(filesystem::CreateDirectory::new(Arc::clone(&policy))),
            Box::new(filesystem::DeleteFile::new(Arc::clone(&policy))),
            Box::new(filesystem::MoveFile::new(Arc::clone(&policy))),
            Box::new(shell::ExecuteCommand::new(Arc::clone(&policy), shell_timeout)),
            Box::new(shell::GetCurrentDirectory::new(Arc::clone(&policy))),
            Box::new(web::WebSearch::new(http.clone(), serp_api_key)),
            Box::new(web::FetchUrl::new(http.clone())),
            Box::new(web::DownloadFile::new(http, policy)),
        ];
        Self { tools }
    }

    /// Build a registry from an explicit tool list.
    #[must_use]
    pub fn new(tools: Vec<Box<dyn Tool>>) -> Self {
        Self { tools }
    }

    /// Schemas advertised to the provider, one per tool.
    #[must_use]
    pub fn schemas(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|tool| {
                serde_json::json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "parameters": tool.parameters(),
                })
            })
            .collect()
    }

    /// Execute the named tool. An unknown name is itself a tool result.
    pub async fn execute(&self, name: &str, args: &Value) -> String {
        let Some(tool) = self.tools.iter().find(|tool| tool.name() == name) else {
            return format!("Error: Unknown tool: {name}");
        };
        info!(tool = name, "executing tool");
        tool.execute(args).await
    }

    /// Names of all registered tools.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }
}

/// Fetch a required string argument, or produce the error string the model
/// sees.
pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, String> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("Error: Missing required argument: {key}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_standard_registry_advertises_the_full_surface() {
        let dir = tempfile::tempdir().unwrap();
        let policy = Arc::new(SafetyPolicy::new(
            &[dir.path().to_path_buf()],
            dir.path().to_path_buf(),
        ));
        let registry =
            ToolRegistry::standard(policy, Duration::from_secs(30), String::new());

        let names = registry.names();
        for expected in [
            "readFile",
            "writeFile",
            "listDirectory",
            "createDirectory",
            "deleteFile",
            "moveFile",
            "executeCommand",
            "getCurrentDirectory",
            "webSearch",
            "fetchUrl",
            "downloadFile",
        ] {
            assert!(names.contains(&expected), "missing tool: {expected}");
        }

        let schemas = registry.schemas();
        assert_eq!(schemas.len(), names.len());
        assert!(schemas
            .iter()
            .all(|schema| schema["parameters"]["type"] == "object"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_a_result_not_an_error() {
        let registry = ToolRegistry::new(Vec::new());
        let result = registry.execute("launchMissiles", &json!({})).await;
        assert_eq!(result, "Error: Unknown tool: launchMissiles");
    }

    #[test]
    fn test_required_str() {
        let args = json!({"fileName": "a.txt", "count": 3});
        assert_eq!(required_str(&args, "fileName").unwrap(), "a.txt");
        assert!(required_str(&args, "missing").is_err());
        assert!(required_str(&args, "count").is_err());
    }
}
