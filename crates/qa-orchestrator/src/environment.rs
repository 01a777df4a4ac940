//! Environment priming (spec §4.9 step 1), grounded in
//! `pyqa/execution/orchestrator.py::_prime_environment`: prepend the
//! nearest virtualenv's `bin/` to `PATH` and seed Node defaults that keep
//! npm/npx non-interactive, without clobbering anything the caller already
//! set explicitly.

use std::collections::BTreeMap;
use std::path::Path;

/// Node environment defaults applied only when the key is not already set,
/// matching the original's "quiet, non-interactive CI mode" posture.
const NODE_DEFAULTS: &[(&str, &str)] = &[
    ("CI", "1"),
    ("npm_config_yes", "true"),
    ("npm_config_fund", "false"),
    ("npm_config_audit", "false"),
    ("npm_config_progress", "false"),
    ("NPX_SILENT", "1"),
];

/// Walk up from `root` looking for a `.venv/bin` directory; the nearest one
/// found (closest to `root`) wins, mirroring the project-local resolution
/// walk in `qa_executor::preparer::local_candidate`.
fn find_virtualenv_bin(root: &Path) -> Option<std::path::PathBuf> {
    for ancestor in root.ancestors() {
        let candidate = ancestor.join(".venv").join("bin");
        if candidate.is_dir() {
            return Some(candidate);
        }
    }
    None
}

/// Build the base environment every action's composed env overlays on top
/// of (spec §4.7 step 1: `ctx.env` is the highest-precedence overlay over
/// `action.env`). Starts from the orchestrator process's own environment so
/// subprocesses can still resolve system binaries, libraries, and locale —
/// `qa_process::run` replaces the child's environment wholesale rather than
/// inheriting it.
pub fn prime_environment(root: &Path) -> BTreeMap<String, String> {
    let mut env: BTreeMap<String, String> = std::env::vars().collect();

    if let Some(venv_bin) = find_virtualenv_bin(root) {
        let existing = env.get("PATH").cloned().unwrap_or_default();
        let prepended = if existing.is_empty() {
            venv_bin.to_string_lossy().into_owned()
        } else {
            format!("{}:{existing}", venv_bin.to_string_lossy())
        };
        env.insert("PATH".to_string(), prepended);
    }

    for (key, value) in NODE_DEFAULTS {
        env.entry((*key).to_string()).or_insert_with(|| (*value).to_string());
    }

    env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prime_environment_prepends_venv_bin_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let venv_bin = dir.path().join(".venv/bin");
        std::fs::create_dir_all(&venv_bin).unwrap();

        let env = prime_environment(dir.path());
        let path = env.get("PATH").unwrap();
        assert!(path.starts_with(&venv_bin.to_string_lossy().into_owned()));
    }

    #[test]
    fn test_prime_environment_sets_node_defaults_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let env = prime_environment(dir.path());
        assert_eq!(env.get("CI").map(String::as_str), Some("1"));
        assert_eq!(env.get("npm_config_yes").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_prime_environment_without_venv_leaves_path_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let before = std::env::var("PATH").unwrap_or_default();
        let env = prime_environment(dir.path());
        assert_eq!(env.get("PATH").cloned().unwrap_or_default(), before);
    }
}
