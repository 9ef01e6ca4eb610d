//! Safety policy gating filesystem paths and shell commands.
//!
//! Two heuristics, both documented as such: a canonicalized-prefix path
//! allow-list and a case-insensitive substring deny-list for shell commands.
//! Neither is a sandbox. Prefix matching on canonicalized paths does not
//! defend against symlink-based escapes, and substring matching can both
//! over-block (substring collisions) and under-block (obfuscated commands).

use std::path::{Component, Path, PathBuf};

use tracing::warn;

/// Command fragments that are never allowed to reach a shell.
const DANGEROUS_COMMANDS: &[&str] = &[
    "rm -rf",
    "sudo",
    "format",
    "mkfs",
    "dd if=",
    ":(){:|:&};:", // fork bomb
    "chmod -R 777",
];

/// Decides whether a filesystem path or shell command is permitted.
#[derive(Clone, Debug)]
pub struct SafetyPolicy {
    /// Canonicalized roots that filesystem tools may touch.
    allowed_roots: Vec<PathBuf>,
    /// Working directory used to resolve relative paths.
    working_dir: PathBuf,
}

impl SafetyPolicy {
    /// Build a policy allowing the given roots. Roots are canonicalized up
    /// front so later prefix checks compare canonical forms on both sides.
    #[must_use]
    pub fn new(allowed_paths: &[PathBuf], working_dir: PathBuf) -> Self {
        let allowed_roots = allowed_paths
            .iter()
            .map(|root| canonicalize_best_effort(root))
            .collect();
        Self {
            allowed_roots,
            working_dir,
        }
    }

    /// Default policy: the current project directory and the user's home.
    #[must_use]
    pub fn with_default_roots() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let mut roots = vec![cwd.clone()];
        if let Some(home) = dirs::home_dir() {
            roots.push(home);
        }
        Self::new(&roots, cwd)
    }

    /// Resolve a candidate path (absolute, or relative to the working
    /// directory) to its canonical absolute form.
    #[must_use]
    pub fn resolve(&self, raw: &str) -> PathBuf {
        let path = PathBuf::from(raw);
        let absolute = if path.is_absolute() {
            path
        } else {
            self.working_dir.join(path)
        };
        canonicalize_best_effort(&absolute)
    }

    /// Whether the canonical form of `path` sits under at least one allowed
    /// root. `path` must already be canonical (see [`Self::resolve`]).
    #[must_use]
    pub fn is_path_allowed(&self, path: &Path) -> bool {
        self.allowed_roots.iter().any(|root| path.starts_with(root))
    }

    /// Resolve `raw` and check it against the allow-list.
    ///
    /// # Errors
    /// Returns the descriptive denial string that tools hand back to the
    /// model verbatim.
    pub fn check_path(&self, raw: &str) -> Result<PathBuf, String> {
        let resolved = self.resolve(raw);
        if self.is_path_allowed(&resolved) {
            Ok(resolved)
        } else {
            warn!(path = raw, resolved = %resolved.display(), "path denied");
            Err(format!(
                "Access denied: Path outside allowed directories. Allowed: {}",
                self.describe_roots()
            ))
        }
    }

    /// Whether `command` contains any deny-listed fragment, case-insensitive.
    #[must_use]
    pub fn is_dangerous_command(&self, command: &str) -> bool {
        let lowered = command.to_lowercase();
        DANGEROUS_COMMANDS
            .iter()
            .any(|fragment| lowered.contains(&fragment.to_lowercase()))
    }

    /// Check a command against the deny-list.
    ///
    /// # Errors
    /// Returns the blocked-command string fed back to the model; the process
    /// is never spawned.
    pub fn check_command(&self, command: &str) -> Result<(), String> {
        if self.is_dangerous_command(command) {
            warn!(command, "dangerous command blocked");
            return Err(format!(
                "BLOCKED: This command appears to be dangerous and has been blocked for safety. Command: {command}"
            ));
        }
        Ok(())
    }

    /// The working directory relative paths resolve against.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn describe_roots(&self) -> String {
        self.allowed_roots
            .iter()
            .map(|root| root.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Canonicalize a path, resolving symlinks where the path exists on disk.
///
/// For paths that do not exist yet (write targets), canonicalize the nearest
/// existing ancestor and re-join the remaining components; fall back to pure
/// lexical normalization when nothing on the path exists.
fn canonicalize_best_effort(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let normalized = lexical_normalize(path);
    let mut ancestor = normalized.as_path();
    while let Some(parent) = ancestor.parent() {
        if let Ok(canonical_parent) = parent.canonicalize() {
            if let Ok(remainder) = normalized.strip_prefix(parent) {
                return canonical_parent.join(remainder);
            }
        }
        ancestor = parent;
    }
    normalized
}

/// Collapse `.`, `..` and redundant separators without touching the
/// filesystem. Root-stable: repeated `..` cannot climb above `/`.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                result.pop();
            }
            other => result.push(other),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy_with_root(root: &Path) -> SafetyPolicy {
        SafetyPolicy::new(&[root.to_path_buf()], root.to_path_buf())
    }

    #[test]
    fn test_path_inside_root_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let policy = policy_with_root(dir.path());
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();

        let resolved = policy
            .check_path(dir.path().join("a.txt").to_str().unwrap())
            .unwrap();
        assert!(policy.is_path_allowed(&resolved));
    }

    #[test]
    fn test_relative_path_resolves_against_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let policy = policy_with_root(dir.path());
        let resolved = policy.check_path("nested/new.txt").unwrap();
        assert!(resolved.starts_with(dir.path().canonicalize().unwrap()));
    }

    #[test]
    fn test_traversal_out_of_root_is_denied() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("project");
        std::fs::create_dir(&inner).unwrap();
        let policy = policy_with_root(&inner);

        let escape = format!("{}/../outside.txt", inner.display());
        let err = policy.check_path(&escape).unwrap_err();
        assert!(err.starts_with("Access denied"), "got: {err}");
    }

    #[test]
    fn test_absolute_path_outside_all_roots_is_denied() {
        let dir = tempfile::tempdir().unwrap();
        let policy = policy_with_root(dir.path());
        assert!(policy.check_path("/etc/passwd").is_err());
    }

    #[test]
    fn test_nonexistent_write_target_under_root_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let policy = policy_with_root(dir.path());
        let resolved = policy
            .check_path(dir.path().join("brand/new/file.txt").to_str().unwrap())
            .unwrap();
        assert!(policy.is_path_allowed(&resolved));
    }

    #[test]
    fn test_lexical_normalize_is_root_stable() {
        assert_eq!(
            lexical_normalize(Path::new("/../../etc/passwd")),
            PathBuf::from("/etc/passwd")
        );
        assert_eq!(
            lexical_normalize(Path::new("/a/./b//c/../d")),
            PathBuf::from("/a/b/d")
        );
    }

    #[test]
    fn test_dangerous_commands_blocked_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let policy = policy_with_root(dir.path());

        for command in [
            "rm -rf /",
            "RM -RF /tmp",
            "sudo apt install x",
            "SuDo whoami",
            "mkfs.ext4 /dev/sda1",
            "dd if=/dev/zero of=/dev/sda",
            ":(){:|:&};:",
            "chmod -R 777 /",
        ] {
            assert!(
                policy.is_dangerous_command(command),
                "should block: {command}"
            );
            let err = policy.check_command(command).unwrap_err();
            assert!(err.starts_with("BLOCKED:"), "got: {err}");
        }
    }

    #[test]
    fn test_benign_commands_pass() {
        let dir = tempfile::tempdir().unwrap();
        let policy = policy_with_root(dir.path());
        for command in ["ls -la", "echo hello", "cargo --version", "git status"] {
            assert!(policy.check_command(command).is_ok(), "should pass: {command}");
        }
    }

    #[test]
    fn test_substring_matching_over_blocks() {
        // Known weakness of the heuristic: "format" collides with unrelated
        // commands. Kept as specified, not silently fixed.
        let dir = tempfile::tempdir().unwrap();
        let policy = policy_with_root(dir.path());
        assert!(policy.is_dangerous_command("cargo fmt --check # format check"));
    }
}
