//! Per-file metrics assembly (spec §3 `FileMetrics`), grounded in
//! `pyqa/execution/action_executor.py::compute_file_metrics` — simplified to
//! a line count plus a diagnostic count, the two fields the spec's data
//! model names.

use std::path::Path;

use qa_core::{Diagnostic, FileMetrics};

/// Build one [`FileMetrics`] per discovered file: `lines` from a best-effort
/// read (0 on any I/O error — a binary or vanished file isn't fatal),
/// `diagnostic_count` from how many of `diagnostics` name this file.
pub fn build_file_metrics(files: &[std::path::PathBuf], diagnostics: &[Diagnostic]) -> Vec<FileMetrics> {
    files
        .iter()
        .map(|file| {
            let lines = std::fs::read_to_string(file).map(|s| s.lines().count() as u64).unwrap_or(0);
            let diagnostic_count = diagnostics.iter().filter(|d| matches_file(d, file)).count() as u64;
            FileMetrics {
                file: file.clone(),
                lines,
                diagnostic_count,
            }
        })
        .collect()
}

fn matches_file(diag: &Diagnostic, file: &Path) -> bool {
    let Some(diag_file) = &diag.file else {
        return false;
    };
    Path::new(diag_file) == file || file.ends_with(diag_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qa_core::Severity;
    use std::path::PathBuf;

    fn diag(file: &str) -> Diagnostic {
        Diagnostic {
            file: Some(file.to_string()),
            line: None,
            column: None,
            severity: Severity::Warning,
            message: "m".to_string(),
            tool: "ruff".to_string(),
            code: None,
            group: None,
            function: None,
            hints: vec![],
            tags: vec![],
            meta: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_build_file_metrics_counts_lines_and_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.py");
        std::fs::write(&file, "one\ntwo\nthree\n").unwrap();

        let diagnostics = vec![diag(&file.to_string_lossy()), diag("unrelated.py")];
        let metrics = build_file_metrics(&[file.clone()], &diagnostics);
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].lines, 3);
        assert_eq!(metrics[0].diagnostic_count, 1);
    }

    #[test]
    fn test_build_file_metrics_missing_file_has_zero_lines() {
        let metrics = build_file_metrics(&[PathBuf::from("/nonexistent/x.py")], &[]);
        assert_eq!(metrics[0].lines, 0);
        assert_eq!(metrics[0].diagnostic_count, 0);
    }
}
