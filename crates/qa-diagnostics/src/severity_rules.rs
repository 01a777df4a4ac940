//! Severity override rules of the form `tool:pattern=severity` (spec §4.8).

use qa_core::Severity;
use regex::Regex;

/// One compiled `tool:pattern=severity` rule. An empty/`*` tool matches any
/// tool. The pattern is matched against the diagnostic code first, then the
/// message, whichever is available.
pub struct SeverityRule {
    pub tool: String,
    pub pattern: Regex,
    pub severity: Severity,
}

impl SeverityRule {
    /// Parse a rule string. Returns `None` for malformed input — callers
    /// should log and skip rather than fail the run over one bad rule.
    pub fn parse(raw: &str) -> Option<Self> {
        let (lhs, severity_str) = raw.split_once('=')?;
        let (tool, pattern_str) = lhs.split_once(':')?;
        let pattern = Regex::new(pattern_str).ok()?;
        let severity = parse_severity_strict(severity_str)?;
        Some(Self {
            tool: tool.to_string(),
            pattern,
            severity,
        })
    }

    fn matches_tool(&self, tool: &str) -> bool {
        self.tool.is_empty() || self.tool == "*" || self.tool.eq_ignore_ascii_case(tool)
    }
}

fn parse_severity_strict(raw: &str) -> Option<Severity> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Severity::Error),
        "warning" => Some(Severity::Warning),
        "notice" => Some(Severity::Notice),
        "note" => Some(Severity::Note),
        _ => None,
    }
}

/// Apply the first matching rule (code checked before message) to override
/// `current`. No match leaves `current` unchanged.
pub fn apply_severity_rules(
    tool: &str,
    code_or_message: &str,
    current: Severity,
    rules: &[SeverityRule],
) -> Severity {
    for rule in rules {
        if rule.matches_tool(tool) && rule.pattern.is_match(code_or_message) {
            return rule.severity;
        }
    }
    current
}
