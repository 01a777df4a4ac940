//! Diagnostic deduplication across a run's outcomes (spec §4.8).

use qa_core::{DedupeConfig, DedupeStrategy, Diagnostic, ExitCategory, Severity, ToolOutcome};

use crate::tags::{issue_tag, AnnotationProvider, IssueTag};

const DEFAULT_DISTANCE: i64 = 1_000_000;

/// Cross-tool code pairs known to report the same underlying issue under
/// different names (spec §4.8).
const CROSS_TOOL_EQUIVALENT_CODES: &[(&str, &str)] = &[
    ("override", "w0221"),
    ("tc002", "reportprivateimportusage"),
    ("f822", "reportunsupporteddunderall"),
    ("f821", "reportundefinedvariable"),
    ("f821", "undefined-variable"),
    ("plr2004", "r2004"),
    ("undefined-variable", "reportundefinedvariable"),
    ("arg-type", "reportargumenttype"),
];

/// Per-pair tool preference overrides that take precedence over the
/// configured strategy.
const CODE_PREFERENCE: &[(&str, &str, &str)] = &[("arg-type", "reportargumenttype", "pyright")];

struct KeptEntry {
    diagnostic: Diagnostic,
    outcome_index: usize,
}

/// Deduplicate diagnostics across `outcomes` in place, in outcome order.
/// No-op when `cfg.enabled` is false.
pub fn dedupe_outcomes(outcomes: &mut [ToolOutcome], cfg: &DedupeConfig, engine: &dyn AnnotationProvider) {
    if !cfg.enabled {
        return;
    }

    let mut kept: Vec<KeptEntry> = Vec::new();

    for (outcome_index, outcome) in outcomes.iter().enumerate() {
        for diag in &outcome.diagnostics {
            let mut replaced = false;
            for entry in &mut kept {
                if !is_duplicate(&entry.diagnostic, diag, cfg, engine) {
                    continue;
                }
                let preferred = prefer(&entry.diagnostic, diag, cfg);
                if preferred != PreferResult::Candidate {
                    replaced = true;
                    break;
                }
                entry.diagnostic = diag.clone();
                entry.outcome_index = outcome_index;
                replaced = true;
                break;
            }
            if !replaced {
                kept.push(KeptEntry {
                    diagnostic: diag.clone(),
                    outcome_index,
                });
            }
        }
    }

    for outcome in outcomes.iter_mut() {
        outcome.diagnostics.clear();
    }
    for entry in kept {
        outcomes[entry.outcome_index].diagnostics.push(entry.diagnostic);
    }
}

fn is_duplicate(existing: &Diagnostic, candidate: &Diagnostic, cfg: &DedupeConfig, engine: &dyn AnnotationProvider) -> bool {
    if !within_same_scope(existing, candidate, cfg) {
        return false;
    }

    if codes_match(existing, candidate) {
        return messages_compatible(existing, candidate, engine) && lines_within_fuzz(existing, candidate, cfg.line_fuzz);
    }

    if cross_tool_equivalent(existing, candidate) {
        return true;
    }

    semantic_overlap(existing, candidate, engine)
}

fn within_same_scope(existing: &Diagnostic, candidate: &Diagnostic, cfg: &DedupeConfig) -> bool {
    if cfg.same_file_only {
        match (&existing.file, &candidate.file) {
            (Some(a), Some(b)) if a != b => return false,
            (None, Some(_)) => return false,
            _ => {}
        }
    }
    existing.function.as_deref().unwrap_or("") == candidate.function.as_deref().unwrap_or("")
}

fn normalized_code(diag: &Diagnostic) -> String {
    diag.code.clone().unwrap_or_default().to_ascii_lowercase()
}

fn codes_match(existing: &Diagnostic, candidate: &Diagnostic) -> bool {
    normalized_code(existing) == normalized_code(candidate)
}

fn line_distance(a: Option<u32>, b: Option<u32>) -> i64 {
    match (a, b) {
        (None, None) => 0,
        (Some(x), Some(y)) => (x as i64 - y as i64).abs(),
        _ => DEFAULT_DISTANCE,
    }
}

fn lines_within_fuzz(existing: &Diagnostic, candidate: &Diagnostic, fuzz: u32) -> bool {
    line_distance(existing.line, candidate.line) <= fuzz as i64
}

fn cross_tool_equivalent(existing: &Diagnostic, candidate: &Diagnostic) -> bool {
    if existing.function != candidate.function || existing.line != candidate.line {
        return false;
    }
    let a = normalized_code(existing);
    let b = normalized_code(candidate);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    CROSS_TOOL_EQUIVALENT_CODES
        .iter()
        .any(|(x, y)| (a == *x && b == *y) || (a == *y && b == *x))
}

fn messages_compatible(existing: &Diagnostic, candidate: &Diagnostic, engine: &dyn AnnotationProvider) -> bool {
    existing.message == candidate.message || semantic_overlap(existing, candidate, engine)
}

fn signatures_match(left: &Diagnostic, right: &Diagnostic, left_sig: &std::collections::BTreeSet<String>, right_sig: &std::collections::BTreeSet<String>) -> bool {
    if let (Some(a), Some(b)) = (&left.code, &right.code) {
        if a == b {
            return true;
        }
    }
    left_sig == right_sig
}

fn semantic_overlap(left: &Diagnostic, right: &Diagnostic, engine: &dyn AnnotationProvider) -> bool {
    if left.file.as_deref().unwrap_or("") != right.file.as_deref().unwrap_or("") {
        return false;
    }
    if let (Some(a), Some(b)) = (&left.function, &right.function) {
        if a != b {
            return false;
        }
    }

    let Some(tag_left) = issue_tag(left, engine) else {
        return false;
    };
    if Some(tag_left) != issue_tag(right, engine).map(|t| t) {
        return false;
    }

    let sig_left = engine.message_signature(&left.message);
    let sig_right = engine.message_signature(&right.message);
    let sig_equal = signatures_match(left, right, &sig_left, &sig_right);

    match tag_left {
        IssueTag::Typing => left.line == right.line && !sig_left.is_disjoint(&sig_right),
        IssueTag::Complexity => {
            if sig_equal {
                return true;
            }
            let common: std::collections::BTreeSet<&str> =
                ["complex", "complexity", "statement", "branch"].into_iter().collect();
            sig_left.iter().any(|t| common.contains(t.as_str())) && sig_right.iter().any(|t| common.contains(t.as_str()))
        }
        _ => sig_equal,
    }
}

#[derive(PartialEq, Eq)]
enum PreferResult {
    Existing,
    Candidate,
}

fn prefer(existing: &Diagnostic, candidate: &Diagnostic, cfg: &DedupeConfig) -> PreferResult {
    if let (Some(ec), Some(cc)) = (&existing.code, &candidate.code) {
        let ec_lower = ec.to_ascii_lowercase();
        let cc_lower = cc.to_ascii_lowercase();
        for (a, b, preferred_tool) in CODE_PREFERENCE {
            let pair_matches = (ec_lower == *a && cc_lower == *b) || (ec_lower == *b && cc_lower == *a);
            if pair_matches {
                if existing.tool.eq_ignore_ascii_case(preferred_tool) {
                    return PreferResult::Existing;
                }
                if candidate.tool.eq_ignore_ascii_case(preferred_tool) {
                    return PreferResult::Candidate;
                }
            }
        }
    }

    match cfg.by {
        DedupeStrategy::First => PreferResult::Existing,
        DedupeStrategy::Severity => higher_severity(existing, candidate),
        DedupeStrategy::Prefer => prefer_list(existing, candidate, &cfg.prefer).unwrap_or_else(|| higher_severity(existing, candidate)),
    }
}

fn higher_severity(existing: &Diagnostic, candidate: &Diagnostic) -> PreferResult {
    if rank(existing.severity) >= rank(candidate.severity) {
        PreferResult::Existing
    } else {
        PreferResult::Candidate
    }
}

fn rank(severity: Severity) -> u8 {
    severity.rank()
}

fn prefer_list(existing: &Diagnostic, candidate: &Diagnostic, prefer: &[String]) -> Option<PreferResult> {
    if prefer.is_empty() {
        return None;
    }
    let existing_index = prefer.iter().position(|t| t == &existing.tool).unwrap_or(prefer.len());
    let candidate_index = prefer.iter().position(|t| t == &candidate.tool).unwrap_or(prefer.len());
    if existing_index == candidate_index {
        return None;
    }
    Some(if existing_index < candidate_index {
        PreferResult::Existing
    } else {
        PreferResult::Candidate
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::NullAnnotationProvider;
    use std::time::Duration;

    fn diag(tool: &str, code: Option<&str>, message: &str, line: Option<u32>) -> Diagnostic {
        Diagnostic {
            file: Some("src/a.py".to_string()),
            line,
            column: None,
            severity: Severity::Warning,
            message: message.to_string(),
            tool: tool.to_string(),
            code: code.map(str::to_string),
            group: None,
            function: None,
            hints: vec![],
            tags: vec![],
            meta: serde_json::Value::Null,
        }
    }

    fn outcome(diagnostics: Vec<Diagnostic>) -> ToolOutcome {
        ToolOutcome {
            tool: "ruff".to_string(),
            action: "lint".to_string(),
            order: 0,
            returncode: 0,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
            diagnostics,
            cached: false,
            timed_out: false,
            category: ExitCategory::default(),
        }
    }

    #[test]
    fn test_dedupe_exact_code_and_message_duplicate() {
        let mut outcomes = vec![outcome(vec![
            diag("ruff", Some("F401"), "F401 unused import", Some(1)),
            diag("ruff", Some("F401"), "F401 unused import", Some(1)),
        ])];
        dedupe_outcomes(&mut outcomes, &DedupeConfig::default(), &NullAnnotationProvider);
        assert_eq!(outcomes[0].diagnostics.len(), 1);
    }

    #[test]
    fn test_dedupe_respects_line_fuzz() {
        let cfg = DedupeConfig {
            line_fuzz: 2,
            ..DedupeConfig::default()
        };
        let mut outcomes = vec![outcome(vec![
            diag("ruff", Some("F401"), "F401 unused import", Some(1)),
            diag("ruff", Some("F401"), "F401 unused import", Some(3)),
        ])];
        dedupe_outcomes(&mut outcomes, &cfg, &NullAnnotationProvider);
        assert_eq!(outcomes[0].diagnostics.len(), 1);
    }

    #[test]
    fn test_dedupe_cross_tool_equivalence() {
        let mut outcomes = vec![outcome(vec![
            diag("mypy", Some("override"), "signature mismatch", Some(5)),
            diag("pylint", Some("W0221"), "arguments differ", Some(5)),
        ])];
        dedupe_outcomes(&mut outcomes, &DedupeConfig::default(), &NullAnnotationProvider);
        assert_eq!(outcomes[0].diagnostics.len(), 1);
    }

    #[test]
    fn test_dedupe_preference_override_picks_named_tool() {
        let cfg = DedupeConfig {
            by: DedupeStrategy::First,
            ..DedupeConfig::default()
        };
        let mut outcomes = vec![outcome(vec![
            diag("mypy", Some("arg-type"), "bad argument type", Some(5)),
            diag("pyright", Some("reportArgumentType"), "bad argument type", Some(5)),
        ])];
        dedupe_outcomes(&mut outcomes, &cfg, &NullAnnotationProvider);
        assert_eq!(outcomes[0].diagnostics.len(), 1);
        assert_eq!(outcomes[0].diagnostics[0].tool, "pyright");
    }

    #[test]
    fn test_dedupe_by_severity_keeps_higher() {
        let cfg = DedupeConfig {
            by: DedupeStrategy::Severity,
            ..DedupeConfig::default()
        };
        let mut low = diag("ruff", Some("F401"), "F401 unused import", Some(1));
        low.severity = Severity::Notice;
        let mut high = diag("ruff", Some("F401"), "F401 unused import", Some(1));
        high.severity = Severity::Error;
        let mut outcomes = vec![outcome(vec![low, high])];
        dedupe_outcomes(&mut outcomes, &cfg, &NullAnnotationProvider);
        assert_eq!(outcomes[0].diagnostics[0].severity, Severity::Error);
    }

    #[test]
    fn test_dedupe_different_files_not_duplicates() {
        let mut a = diag("ruff", Some("F401"), "F401 unused import", Some(1));
        a.file = Some("src/a.py".to_string());
        let mut b = diag("ruff", Some("F401"), "F401 unused import", Some(1));
        b.file = Some("src/b.py".to_string());
        let mut outcomes = vec![outcome(vec![a, b])];
        dedupe_outcomes(&mut outcomes, &DedupeConfig::default(), &NullAnnotationProvider);
        assert_eq!(outcomes[0].diagnostics.len(), 2);
    }

    #[test]
    fn test_dedupe_disabled_is_noop() {
        let cfg = DedupeConfig {
            enabled: false,
            ..DedupeConfig::default()
        };
        let mut outcomes = vec![outcome(vec![
            diag("ruff", Some("F401"), "F401 unused import", Some(1)),
            diag("ruff", Some("F401"), "F401 unused import", Some(1)),
        ])];
        dedupe_outcomes(&mut outcomes, &cfg, &NullAnnotationProvider);
        assert_eq!(outcomes[0].diagnostics.len(), 2);
    }
}
