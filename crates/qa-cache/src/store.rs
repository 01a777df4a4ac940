//! Disk-backed result cache (spec §3, §4.3, §6).

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use qa_core::{Diagnostic, ExitCategory, FileMetrics, FileState, ToolOutcome};
use serde::{Deserialize, Serialize};

use crate::state::{collect_file_states, states_match};
use crate::token::entry_key;

/// Matches `qa_process::TIMEOUT_RETURNCODE`; duplicated here to avoid a
/// dependency on the process crate purely for one constant.
const TIMEOUT_RETURNCODE: i32 = 124;

/// Normalized inputs identifying one cacheable command invocation
/// (spec §3 "CacheRequest").
#[derive(Debug, Clone)]
pub struct CacheRequest {
    pub tool: String,
    pub action: String,
    pub command: Vec<String>,
    pub files: Vec<PathBuf>,
    pub token: String,
}

/// Cached outcome plus the file metrics recorded alongside it.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub outcome: ToolOutcome,
    pub file_metrics: Vec<FileMetrics>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryPayload {
    tool: String,
    action: String,
    returncode: i32,
    stdout: Vec<String>,
    stderr: Vec<String>,
    diagnostics: Vec<Diagnostic>,
    #[serde(default)]
    files: Vec<FileState>,
    #[serde(default)]
    file_metrics: Vec<FileMetrics>,
}

/// Persists and reloads tool outcomes under `<cache_dir>/<entry_key>.json`.
///
/// Reads and writes are best-effort: a missing, malformed, or stale entry is
/// simply a cache miss, and a write failure is swallowed (spec §4.3, §7
/// `CacheUnavailable`).
pub struct ResultCache {
    dir: PathBuf,
}

impl ResultCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, request: &CacheRequest) -> PathBuf {
        let key = entry_key(&request.tool, &request.action, &request.command, &request.token);
        self.dir.join(format!("{key}.json"))
    }

    pub fn load(&self, request: &CacheRequest) -> Option<CachedEntry> {
        let entry_path = self.entry_path(request);
        let contents = std::fs::read_to_string(&entry_path).ok()?;
        let payload: EntryPayload = serde_json::from_str(&contents).ok()?;

        let current_states = collect_file_states(&request.files)?;
        if !states_match(&current_states, &payload.files) {
            return None;
        }

        let outcome = ToolOutcome {
            tool: payload.tool,
            action: payload.action,
            order: 0,
            returncode: payload.returncode,
            stdout: payload.stdout.join("\n"),
            stderr: payload.stderr.join("\n"),
            duration: Duration::ZERO,
            diagnostics: payload.diagnostics,
            cached: true,
            timed_out: payload.returncode == TIMEOUT_RETURNCODE,
            category: ExitCategory::default(),
        };

        Some(CachedEntry {
            outcome,
            file_metrics: payload.file_metrics,
        })
    }

    /// Best-effort store: silently skips if any requested file is missing at
    /// capture time, or if the write fails.
    pub fn store(&self, request: &CacheRequest, outcome: &ToolOutcome, file_metrics: &[FileMetrics]) {
        let Some(states) = collect_file_states(&request.files) else {
            return;
        };

        if std::fs::create_dir_all(&self.dir).is_err() {
            return;
        }

        let payload = EntryPayload {
            tool: outcome.tool.clone(),
            action: outcome.action.clone(),
            returncode: outcome.returncode,
            stdout: outcome.stdout.lines().map(str::to_string).collect(),
            stderr: outcome.stderr.lines().map(str::to_string).collect(),
            diagnostics: outcome.diagnostics.clone(),
            files: states,
            file_metrics: file_metrics.to_vec(),
        };

        let Ok(serialized) = serde_json::to_vec_pretty(&payload) else {
            return;
        };

        let _ = write_atomic(&self.entry_path(request), &serialized);
    }
}

/// Write via a sibling tempfile then rename, so concurrent readers never
/// observe a partially written entry (spec §5 cache write safety).
fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
