//! Filesystem tools, every path gated by the safety policy.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::safety::SafetyPolicy;

use super::{required_str, Tool};

/// Read a file's contents.
pub struct ReadFile {
    policy: Arc<SafetyPolicy>,
}

impl ReadFile {
    /// Build the tool.
    #[must_use]
    pub fn new(policy: Arc<SafetyPolicy>) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Tool for ReadFile {
    fn name(&self) -> &'static str {
        "readFile"
    }

    fn description(&self) -> &'static str {
        "Read the content of a file"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "fileName": {"type": "string", "description": "The name of the file to read"}
            },
            "required": ["fileName"]
        })
    }

    async fn execute(&self, args: &Value) -> String {
        let file_name = match required_str(args, "fileName") {
            Ok(name) => name,
            Err(msg) => return msg,
        };
        debug!(file_name, "reading file");
        let path = match self.policy.check_path(file_name) {
            Ok(path) => path,
            Err(denied) => return denied,
        };
        if !path.is_file() {
            return format!("File not found: {file_name}");
        }
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) => format!("Error reading file: {err}"),
        }
    }
}

/// Write (create or overwrite) a file.
pub struct WriteFile {
    policy: Arc<SafetyPolicy>,
}

impl WriteFile {
    /// Build the tool.
    #[must_use]
    pub fn new(policy: Arc<SafetyPolicy>) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Tool for WriteFile {
    fn name(&self) -> &'static str {
        "writeFile"
    }

    fn description(&self) -> &'static str {
        "Write content to a file (creates new file or overwrites existing)"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "fileName": {"type": "string", "description": "The name of the file to write"},
                "content": {"type": "string", "description": "The content to write to the file"}
            },
            "required": ["fileName", "content"]
        })
    }

    async fn execute(&self, args: &Value) -> String {
        let file_name = match required_str(args, "fileName") {
            Ok(name) => name,
            Err(msg) => return msg,
        };
        let content = match required_str(args, "content") {
            Ok(content) => content,
            Err(msg) => return msg,
        };
        debug!(file_name, bytes = content.len(), "writing file");
        let path = match self.policy.check_path(file_name) {
            Ok(path) => path,
            Err(denied) => return denied,
        };
        match tokio::fs::write(&path, content).await {
            Ok(()) => format!("Successfully wrote to {file_name}"),
            Err(err) => format!("Error writing file: {err}"),
        }
    }
}

/// List a directory's entries.
pub struct ListDirectory {
    policy: Arc<SafetyPolicy>,
}

impl ListDirectory {
    /// Build the tool.
    #[must_use]
    pub fn new(policy: Arc<SafetyPolicy>) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Tool for ListDirectory {
    fn name(&self) -> &'static str {
        "listDirectory"
    }

    fn description(&self) -> &'static str {
        "List all files and directories in a given path"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "dirPath": {
                    "type": "string",
                    "description": "Directory path to list (relative or absolute)",
                    "default": "."
                }
            },
            "required": []
        })
    }

    async fn execute(&self, args: &Value) -> String {
        let dir_path = args
            .get("dirPath")
            .and_then(Value::as_str)
            .unwrap_or(".");
        debug!(dir_path, "listing directory");
        let path = match self.policy.check_path(dir_path) {
            Ok(path) => path,
            Err(denied) => return denied,
        };

        let mut entries = match tokio::fs::read_dir(&path).await {
            Ok(entries) => entries,
            Err(err) => return format!("Error listing directory: {err}"),
        };
        let mut items = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let kind = match entry.file_type().await {
                        Ok(file_type) if file_type.is_dir() => "directory",
                        _ => "file",
                    };
                    items.push(json!({
                        "name": entry.file_name().to_string_lossy(),
                        "type": kind,
                    }));
                }
                Ok(None) => break,
                Err(err) => return format!("Error listing directory: {err}"),
            }
        }
        // Stable output regardless of readdir order.
        items.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));
        serde_json::to_string_pretty(&items)
            .unwrap_or_else(|err| format!("Error listing directory: {err}"))
    }
}

/// Create a directory (and parents).
pub struct CreateDirectory {
    policy: Arc<SafetyPolicy>,
}

impl CreateDirectory {
    /// Build the tool.
    #[must_use]
    pub fn new(policy: Arc<SafetyPolicy>) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Tool for CreateDirectory {
    fn name(&self) -> &'static str {
        "createDirectory"
    }

    fn description(&self) -> &'static str {
        "Create a new directory"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "dirPath": {"type": "string", "description": "Path of the directory to create"}
            },
            "required": ["dirPath"]
        })
    }

    async fn execute(&self, args: &Value) -> String {
        let dir_path = match required_str(args, "dirPath") {
            Ok(path) => path,
            Err(msg) => return msg,
        };
        debug!(dir_path, "creating directory");
        let path = match self.policy.check_path(dir_path) {
            Ok(path) => path,
            Err(denied) => return denied,
        };
        match tokio::fs::create_dir_all(&path).await {
            Ok(()) => format!("Successfully created directory: {dir_path}"),
            Err(err) => format!("Error creating directory: {err}"),
        }
    }
}

/// Delete a file.
pub struct DeleteFile {
    policy: Arc<SafetyPolicy>,
}

impl DeleteFile {
    /// Build the tool.
    #[must_use]
    pub fn new(policy: Arc<SafetyPolicy>) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Tool for DeleteFile {
    fn name(&self) -> &'static str {
        "deleteFile"
    }

    fn description(&self) -> &'static str {
        "Delete a file (WARNING: This is permanent!)"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "fileName": {"type": "string", "description": "The name of the file to delete"}
            },
            "required": ["fileName"]
        })
    }

    async fn execute(&self, args: &Value) -> String {
        let file_name = match required_str(args, "fileName") {
            Ok(name) => name,
            Err(msg) => return msg,
        };
        debug!(file_name, "deleting file");
        let path = match self.policy.check_path(file_name) {
            Ok(path) => path,
            Err(denied) => return denied,
        };
        if !path.exists() {
            return format!("File not found: {file_name}");
        }
        match tokio::fs::remove_file(&path).await {
            Ok(()) => format!("Successfully deleted: {file_name}"),
            Err(err) => format!("Error deleting file: {err}"),
        }
    }
}

/// Move or rename a file; both endpoints must be allowed.
pub struct MoveFile {
    policy: Arc<SafetyPolicy>,
}

impl MoveFile {
    /// Build the tool.
    #[must_use]
    pub fn new(policy: Arc<SafetyPolicy>) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Tool for MoveFile {
    fn name(&self) -> &'static str {
        "moveFile"
    }

    fn description(&self) -> &'static str {
        "Move or rename a file"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sourcePath": {"type": "string", "description": "Current path of the file"},
                "destinationPath": {"type": "string", "description": "New path for the file"}
            },
            "required": ["sourcePath", "destinationPath"]
        })
    }

    async fn execute(&self, args: &Value) -> String {
        let source = match required_str(args, "sourcePath") {
            Ok(path) => path,
            Err(msg) => return msg,
        };
        let destination = match required_str(args, "destinationPath") {
            Ok(path) => path,
            Err(msg) => return msg,
        };
        debug!(source, destination, "moving file");
        let safe_source = match self.policy.check_path(source) {
            Ok(path) => path,
            Err(denied) => return denied,
        };
        let safe_destination = match self.policy.check_path(destination) {
            Ok(path) => path,
            Err(denied) => return denied,
        };
        if !safe_source.exists() {
            return format!("Source file not found: {source}");
        }
        match tokio::fs::rename(&safe_source, &safe_destination).await {
            Ok(()) => format!("Successfully moved {source} to {destination}"),
            Err(err) => format!("Error moving file: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, Arc<SafetyPolicy>) {
        let dir = tempfile::tempdir().unwrap();
        let policy = Arc::new(SafetyPolicy::new(
            &[dir.path().to_path_buf()],
            dir.path().to_path_buf(),
        ));
        (dir, policy)
    }

    #[tokio::test]
    async fn test_read_file_round_trip() {
        let (dir, policy) = setup();
        std::fs::write(dir.path().join("note.txt"), "hello").unwrap();

        let result = ReadFile::new(policy).execute(&json!({"fileName": "note.txt"})).await;
        assert_eq!(result, "hello");
    }

    #[tokio::test]
    async fn test_read_missing_file_reports_not_found() {
        let (_dir, policy) = setup();
        let result = ReadFile::new(policy)
            .execute(&json!({"fileName": "ghost.txt"}))
            .await;
        assert_eq!(result, "File not found: ghost.txt");
    }

    #[tokio::test]
    async fn test_read_outside_allowed_roots_is_denied() {
        let (_dir, policy) = setup();
        let result = ReadFile::new(policy)
            .execute(&json!({"fileName": "/etc/passwd"}))
            .await;
        assert!(result.starts_with("Access denied"), "got: {result}");
    }

    #[tokio::test]
    async fn test_missing_argument_is_a_result_string() {
        let (_dir, policy) = setup();
        let result = ReadFile::new(policy).execute(&json!({})).await;
        assert_eq!(result, "Error: Missing required argument: fileName");
    }

    #[tokio::test]
    async fn test_write_then_read_back() {
        let (dir, policy) = setup();
        let write = WriteFile::new(Arc::clone(&policy));
        let result = write
            .execute(&json!({"fileName": "out.txt", "content": "payload"}))
            .await;
        assert_eq!(result, "Successfully wrote to out.txt");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out.txt")).unwrap(),
            "payload"
        );
    }

    #[tokio::test]
    async fn test_list_directory_defaults_to_working_dir() {
        let (dir, policy) = setup();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let result = ListDirectory::new(policy).execute(&json!({})).await;
        let items: Vec<Value> = serde_json::from_str(&result).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["name"], "a.txt");
        assert_eq!(items[0]["type"], "file");
        assert_eq!(items[2]["name"], "sub");
        assert_eq!(items[2]["type"], "directory");
    }

    #[tokio::test]
    async fn test_create_directory_is_recursive() {
        let (dir, policy) = setup();
        let result = CreateDirectory::new(policy)
            .execute(&json!({"dirPath": "a/b/c"}))
            .await;
        assert_eq!(result, "Successfully created directory: a/b/c");
        assert!(dir.path().join("a/b/c").is_dir());
    }

    #[tokio::test]
    async fn test_delete_file() {
        let (dir, policy) = setup();
        std::fs::write(dir.path().join("doomed.txt"), "x").unwrap();

        let delete = DeleteFile::new(policy);
        let result = delete.execute(&json!({"fileName": "doomed.txt"})).await;
        assert_eq!(result, "Successfully deleted: doomed.txt");
        assert!(!dir.path().join("doomed.txt").exists());

        let result = delete.execute(&json!({"fileName": "doomed.txt"})).await;
        assert_eq!(result, "File not found: doomed.txt");
    }

    #[tokio::test]
    async fn test_move_file_checks_both_endpoints() {
        let (dir, policy) = setup();
        std::fs::write(dir.path().join("src.txt"), "x").unwrap();

        let tool = MoveFile::new(policy);
        let denied = tool
            .execute(&json!({"sourcePath": "src.txt", "destinationPath": "/tmp/escape.txt"}))
            .await;
        assert!(denied.starts_with("Access denied"), "got: {denied}");

        let moved = tool
            .execute(&json!({"sourcePath": "src.txt", "destinationPath": "dst.txt"}))
            .await;
        assert_eq!(moved, "Successfully moved src.txt to dst.txt");
        assert!(dir.path().join("dst.txt").exists());

        let missing = tool
            .execute(&json!({"sourcePath": "src.txt", "destinationPath": "other.txt"}))
            .await;
        assert_eq!(missing, "Source file not found: src.txt");
    }
}
