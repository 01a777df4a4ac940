//! Suppression filtering by regex over file path or message (spec §4.8).

use qa_core::Diagnostic;
use regex::Regex;

/// Drop diagnostics whose file or message matches any pattern.
pub fn filter_suppressed(diagnostics: Vec<Diagnostic>, patterns: &[Regex]) -> Vec<Diagnostic> {
    diagnostics
        .into_iter()
        .filter(|diag| !is_suppressed(diag, patterns))
        .collect()
}

fn is_suppressed(diag: &Diagnostic, patterns: &[Regex]) -> bool {
    patterns.iter().any(|pattern| {
        diag.file.as_deref().is_some_and(|f| pattern.is_match(f)) || pattern.is_match(&diag.message)
    })
}
