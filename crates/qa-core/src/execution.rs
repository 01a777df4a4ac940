//! Run-time execution model: requests, invocations, outcomes (spec §3, §4).

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;

/// File discovery knobs (spec §4.4).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileDiscoveryConfig {
    #[serde(default)]
    pub roots: Vec<PathBuf>,
    #[serde(default)]
    pub limit_to: Vec<PathBuf>,
    #[serde(default)]
    pub respect_gitignore: bool,
    #[serde(default)]
    pub include_untracked: bool,
}

/// Tie-break strategy when two diagnostics are judged duplicates (spec §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupeStrategy {
    First,
    Severity,
    Prefer,
}

/// Diagnostic dedup knobs (spec §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupeConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_line_fuzz")]
    pub line_fuzz: u32,
    #[serde(default)]
    pub prefer: Vec<String>,
    #[serde(default)]
    pub by: DedupeStrategy,
    #[serde(default = "default_true_flag")]
    pub same_file_only: bool,
}

fn default_line_fuzz() -> u32 {
    0
}

fn default_true_flag() -> bool {
    true
}

impl Default for DedupeStrategy {
    fn default() -> Self {
        DedupeStrategy::First
    }
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            line_fuzz: default_line_fuzz(),
            prefer: Vec::new(),
            by: DedupeStrategy::default(),
            same_file_only: true,
        }
    }
}

/// Top-level request describing one orchestration run (spec §3, §4.2).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub root: PathBuf,
    pub only: Vec<String>,
    pub languages: Vec<String>,
    pub detected_languages: Vec<String>,
    pub file_discovery: FileDiscoveryConfig,
    pub dedupe: DedupeConfig,
    pub bail: bool,
    pub strict: bool,
    pub fix_only: bool,
    pub check_only: bool,
    pub force_all: bool,
    pub respect_config: bool,
    pub line_length: u32,
    pub cache_enabled: bool,
    pub cache_dir: Option<PathBuf>,
    pub use_local_linters: bool,
    pub jobs: usize,
    pub env: BTreeMap<String, String>,
    pub tool_settings: BTreeMap<String, serde_json::Value>,
    pub severity_rules: Vec<String>,
}

impl RunConfig {
    /// `jobs` defaults to the available parallelism, matching the worker
    /// pool sizing rule in spec §5.
    pub fn new(root: PathBuf) -> Self {
        let jobs = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            root,
            only: Vec::new(),
            languages: Vec::new(),
            detected_languages: Vec::new(),
            file_discovery: FileDiscoveryConfig::default(),
            dedupe: DedupeConfig::default(),
            bail: false,
            strict: false,
            fix_only: false,
            check_only: false,
            force_all: false,
            respect_config: true,
            line_length: 88,
            cache_enabled: true,
            cache_dir: None,
            use_local_linters: false,
            jobs,
            env: BTreeMap::new(),
            tool_settings: BTreeMap::new(),
            severity_rules: Vec::new(),
        }
    }

    /// `fix_only`/`check_only` filter which actions of a tool run this pass
    /// (spec §4.9 step 6): `fix_only` keeps only `is_fix` actions,
    /// `check_only` keeps the complement. Both false (the default) runs
    /// everything.
    pub fn action_allowed(&self, is_fix: bool) -> bool {
        if self.fix_only {
            return is_fix;
        }
        if self.check_only {
            return !is_fix;
        }
        true
    }
}

/// Environment a prepared command executes under (spec §3).
///
/// `settings` is the frozen per-tool settings map drawn from
/// `RunConfig.tool_settings`; command builders and parsers read it but never
/// mutate it.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
    pub files: Vec<PathBuf>,
    pub settings: serde_json::Value,
}

/// Where a [`PreparedCommand`]'s executable was resolved from (spec §3, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandSource {
    System,
    Project,
}

/// Fully resolved argv plus execution metadata, ready to spawn (spec §3, §4.6).
#[derive(Debug, Clone)]
pub struct PreparedCommand {
    pub argv: Vec<String>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
    pub version: Option<String>,
    pub source: CommandSource,
}

/// One scheduled `(tool, action)` pair submitted to the worker pool (spec §5).
#[derive(Debug, Clone)]
pub struct ActionInvocation {
    pub tool: String,
    pub action: String,
    pub order: usize,
    pub command: PreparedCommand,
    pub is_fix: bool,
}

/// Adjusted exit classification for a completed action (spec §4.7 step 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitCategory {
    Success,
    Diagnostic,
    ToolFailure,
    #[default]
    Unknown,
}

/// Process-level result of running one [`ActionInvocation`] (spec §3, §4.7).
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub tool: String,
    pub action: String,
    pub order: usize,
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub diagnostics: Vec<Diagnostic>,
    pub cached: bool,
    pub timed_out: bool,
    pub category: ExitCategory,
}

impl ToolOutcome {
    pub fn is_failure(&self, ignore_exit: bool) -> bool {
        if self.timed_out {
            return true;
        }
        if ignore_exit && self.diagnostics.is_empty() {
            return false;
        }
        self.returncode != 0
    }
}

/// Per-file statistics surfaced alongside diagnostics (spec §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileMetrics {
    pub file: PathBuf,
    pub lines: u64,
    pub diagnostic_count: u64,
}

/// Cached filesystem fingerprint of one discovered file (spec §3, §4.3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileState {
    pub path: PathBuf,
    pub size: u64,
    pub mtime_nanos: i64,
}

/// Final aggregate of an orchestration run (spec §3, §4.9).
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    pub outcomes: Vec<ToolOutcome>,
    pub diagnostics: Vec<Diagnostic>,
    pub file_metrics: Vec<FileMetrics>,
    pub bail_triggered: bool,
    pub installed_tools: Vec<String>,
}

impl RunResult {
    pub fn exit_code(&self) -> i32 {
        let has_tool_failure = self.outcomes.iter().any(|o| o.is_failure(false) && !o.timed_out);
        let has_timeout = self.outcomes.iter().any(|o| o.timed_out);
        let has_diagnostics = !self.diagnostics.is_empty();
        if has_timeout || has_tool_failure {
            2
        } else if has_diagnostics {
            1
        } else {
            0
        }
    }
}
