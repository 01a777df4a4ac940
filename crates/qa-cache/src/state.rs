//! File-state capture used to validate cache entries (spec §3, §4.3).

use std::path::Path;

use qa_core::FileState;

/// Stat every file in `files`. Returns `None` if any file is missing —
/// callers treat that as an automatic cache miss.
pub fn collect_file_states(files: &[std::path::PathBuf]) -> Option<Vec<FileState>> {
    let mut states = Vec::with_capacity(files.len());
    for path in files {
        let canonical = path.canonicalize().ok()?;
        let metadata = std::fs::metadata(&canonical).ok()?;
        let mtime_nanos = mtime_nanos(&metadata);
        states.push(FileState {
            path: canonical,
            size: metadata.len(),
            mtime_nanos,
        });
    }
    Some(states)
}

#[cfg(unix)]
fn mtime_nanos(metadata: &std::fs::Metadata) -> i64 {
    use std::os::unix::fs::MetadataExt;
    metadata.mtime() * 1_000_000_000 + metadata.mtime_nsec()
}

#[cfg(not(unix))]
fn mtime_nanos(metadata: &std::fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

/// Current states must match the stored states exactly, by path set and by
/// `(mtime_nanos, size)` pair.
pub fn states_match(current: &[FileState], stored: &[FileState]) -> bool {
    if current.len() != stored.len() {
        return false;
    }
    let stored_by_path: std::collections::HashMap<_, _> =
        stored.iter().map(|s| (s.path.clone(), s)).collect();
    current.iter().all(|state| {
        stored_by_path
            .get(&state.path)
            .is_some_and(|s| s.size == state.size && s.mtime_nanos == state.mtime_nanos)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_collect_file_states_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.py");
        assert!(collect_file_states(&[missing]).is_none());
    }

    #[test]
    fn test_collect_file_states_present_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.py");
        fs::write(&file, "x").unwrap();
        let states = collect_file_states(&[file]).unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].size, 1);
    }

    #[test]
    fn test_states_match_detects_mismatch() {
        let a = FileState {
            path: "/a".into(),
            size: 1,
            mtime_nanos: 10,
        };
        let b = FileState {
            path: "/a".into(),
            size: 2,
            mtime_nanos: 10,
        };
        assert!(!states_match(&[a.clone()], &[b]));
        assert!(states_match(&[a.clone()], &[a]));
    }

    #[test]
    fn test_states_match_detects_path_set_mismatch() {
        let a = FileState {
            path: "/a".into(),
            size: 1,
            mtime_nanos: 10,
        };
        let b = FileState {
            path: "/b".into(),
            size: 1,
            mtime_nanos: 10,
        };
        assert!(!states_match(&[a], &[b]));
    }
}
