use super::permissions::BashPermissions;
use crate::error::ToolError;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const MAX_TIMEOUT_SECS: u64 = 600;
const MAX_OUTPUT_CHARS: usize = 30_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BashOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub execution_time_ms: u64,
}

/// Runs permitted commands under `bash -c` with a timeout.
#[derive(Debug, Clone)]
pub struct BashExecutor {
    permissions: BashPermissions,
    default_timeout_secs: u64,
}

impl BashExecutor {
    pub fn new(permissions: BashPermissions) -> Self {
        Self {
            permissions,
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_default_timeout(mut self, secs: u64) -> Self {
        self.default_timeout_secs = secs.clamp(1, MAX_TIMEOUT_SECS);
        self
    }

    pub fn permissions(&self) -> &BashPermissions {
        &self.permissions
    }

    pub async fn execute(
        &self,
        command: &str,
        working_dir: &Path,
        timeout_secs: Option<u64>,
    ) -> Result<BashOutput, ToolError> {
        self.permissions.check_command(command)?;

        let timeout_secs = timeout_secs
            .unwrap_or(self.default_timeout_secs)
            .clamp(1, MAX_TIMEOUT_SECS);
        tracing::debug!(command, timeout_secs, working_dir = %working_dir.display(), "Running command");

        let started = Instant::now();
        let child = Command::new("bash")
            .arg("-c")
            .arg(command)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            child.wait_with_output(),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(command, timeout_secs, "Command timed out");
                return Err(ToolError::Timeout(format!(
                    "Command timed out after {}s: {}",
                    timeout_secs, command
                )));
            }
        };

        Ok(BashOutput {
            stdout: truncate_middle(&String::from_utf8_lossy(&output.stdout)),
            stderr: truncate_middle(&String::from_utf8_lossy(&output.stderr)),
            exit_code: output.status.code().unwrap_or(-1),
            execution_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Keep the head and tail of long output, dropping the middle.
fn truncate_middle(text: &str) -> String {
    let total = text.chars().count();
    if total <= MAX_OUTPUT_CHARS {
        return text.to_string();
    }

    let keep = MAX_OUTPUT_CHARS / 2;
    let head: String = text.chars().take(keep).collect();
    let tail: String = text.chars().skip(total - keep).collect();
    format!(
        "{}\n\n... [{} characters truncated] ...\n\n{}",
        head,
        total - keep * 2,
        tail
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn executor(commands: &[&str]) -> BashExecutor {
        BashExecutor::new(BashPermissions::minimal(commands).unwrap())
    }

    #[tokio::test]
    async fn test_runs_allowed_command() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hi there").unwrap();

        let output = executor(&["cat"])
            .execute("cat hello.txt", dir.path(), None)
            .await
            .unwrap();
        assert_eq!(output.stdout, "hi there");
        assert_eq!(output.exit_code, 0);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let output = executor(&["ls"])
            .execute("ls does-not-exist", dir.path(), None)
            .await
            .unwrap();
        assert_ne!(output.exit_code, 0);
        assert!(!output.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_denied_command_never_runs() {
        let dir = TempDir::new().unwrap();
        let result = executor(&["ls"])
            .execute("touch created.txt", dir.path(), None)
            .await;
        assert!(matches!(result, Err(ToolError::PermissionDenied(_))));
        assert!(!dir.path().join("created.txt").exists());
    }

    #[tokio::test]
    async fn test_side_effects_stay_in_working_dir() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let marker = outside.path().join("marker");
        let exec = executor(&["true", "cat"]);

        let substituted = exec
            .execute(&format!("true <(touch {})", marker.display()), dir.path(), None)
            .await;
        assert!(matches!(substituted, Err(ToolError::PermissionDenied(_))));

        std::fs::write(dir.path().join("hello.txt"), "hi").unwrap();
        let redirected = exec
            .execute(&format!("cat hello.txt > {}", marker.display()), dir.path(), None)
            .await;
        assert!(matches!(redirected, Err(ToolError::PermissionDenied(_))));
        assert!(!marker.exists());

        let output = exec
            .execute("cat hello.txt > copy.txt 2>&1", dir.path(), None)
            .await
            .unwrap();
        assert_eq!(output.exit_code, 0);
        assert_eq!(std::fs::read_to_string(dir.path().join("copy.txt")).unwrap(), "hi");
    }

    #[tokio::test]
    async fn test_timeout() {
        let dir = TempDir::new().unwrap();
        let result = executor(&["sleep"])
            .execute("sleep 5", dir.path(), Some(1))
            .await;
        assert!(matches!(result, Err(ToolError::Timeout(_))));
    }

    #[test]
    fn test_truncate_middle() {
        let long = "a".repeat(20_000) + &"b".repeat(20_000);
        let out = truncate_middle(&long);
        assert!(out.starts_with("aaaa"));
        assert!(out.ends_with("bbbb"));
        assert!(out.contains("[10000 characters truncated]"));
        assert_eq!(truncate_middle("short"), "short");
    }
}
