//! Structured failure logging (spec §4.7 step 7), grounded in
//! `pyqa/execution/action_executor.py::_log_action_failure` /
//! `_summarize_files` / `_last_non_empty_line`.

use std::path::{Path, PathBuf};

/// Shell-quote one argv token the way `shlex.join` would: wrap in single
/// quotes whenever it contains anything other than `[A-Za-z0-9_./-]`,
/// escaping embedded single quotes as `'\''`.
fn shell_quote(token: &str) -> String {
    let needs_quoting = token.is_empty()
        || !token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/' | '-'));
    if !needs_quoting {
        return token.to_string();
    }
    format!("'{}'", token.replace('\'', "'\\''"))
}

/// Join an argv into a single shell-quoted command line.
pub fn shell_join(argv: &[String]) -> String {
    argv.iter().map(|t| shell_quote(t)).collect::<Vec<_>>().join(" ")
}

/// First five files (relative to `root` when possible), with the remainder
/// collapsed to `"(+N more)"` (`_summarize_files`).
pub fn summarize_files(files: &[PathBuf], root: &Path) -> String {
    if files.is_empty() {
        return "(no files)".to_string();
    }
    let displayed: Vec<String> = files
        .iter()
        .take(5)
        .map(|f| f.strip_prefix(root).unwrap_or(f).display().to_string())
        .collect();
    let mut summary = displayed.join(", ");
    if files.len() > 5 {
        summary.push_str(&format!(" (+{} more)", files.len() - 5));
    }
    summary
}

/// Last non-empty line of `text`, shortened to at most `width` characters
/// with a `...` ellipsis inserted to preserve the start and end, mirroring
/// `textwrap.shorten(text, width=160)` (`_last_non_empty_line`).
pub fn last_non_empty_line(text: &str, width: usize) -> String {
    let Some(line) = text.lines().rev().find(|l| !l.trim().is_empty()) else {
        return String::new();
    };
    let line = line.trim();
    shorten(line, width)
}

fn shorten(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width <= 3 {
        return text.chars().take(width).collect();
    }
    let budget = width - 3;
    let head = budget - budget / 2;
    let tail = budget - head;
    let chars: Vec<char> = text.chars().collect();
    let head_part: String = chars[..head].iter().collect();
    let tail_part: String = chars[chars.len() - tail..].iter().collect();
    format!("{head_part}...{tail_part}")
}

/// One structured failure record for a non-zero/tool-failure outcome
/// (spec §4.7 step 7).
#[derive(Debug, Clone)]
pub struct FailureRecord {
    pub tool: String,
    pub action: String,
    pub command: String,
    pub cwd: PathBuf,
    pub diagnostic_count: usize,
    pub files: String,
    pub last_stderr_line: String,
    pub last_stdout_line: String,
    pub returncode: i32,
}

impl FailureRecord {
    pub fn new(
        tool: &str,
        action: &str,
        argv: &[String],
        cwd: &Path,
        root: &Path,
        files: &[PathBuf],
        diagnostic_count: usize,
        stdout: &str,
        stderr: &str,
        returncode: i32,
    ) -> Self {
        Self {
            tool: tool.to_string(),
            action: action.to_string(),
            command: shell_join(argv),
            cwd: cwd.to_path_buf(),
            diagnostic_count,
            files: summarize_files(files, root),
            last_stderr_line: last_non_empty_line(stderr, 160),
            last_stdout_line: last_non_empty_line(stdout, 160),
            returncode,
        }
    }

    /// Emit this record at `tracing::warn!` level with consistent field names.
    pub fn log(&self) {
        tracing::warn!(
            tool = %self.tool,
            action = %self.action,
            command = %self.command,
            cwd = %self.cwd.display(),
            returncode = self.returncode,
            diagnostic_count = self.diagnostic_count,
            files = %self.files,
            stderr_tail = %self.last_stderr_line,
            stdout_tail = %self.last_stdout_line,
            "action failed"
        );
    }
}
