//! `RawDiagnostic` → `Diagnostic` normalization (spec §4.8).

use qa_core::{Diagnostic, RawDiagnostic, Severity};

use crate::severity_rules::{apply_severity_rules, SeverityRule};

/// Default every field, resolve severity (enum pass-through, lenient string
/// coercion, code-prefix stripping on the message), then apply severity
/// rules keyed on code-or-message.
pub fn normalize(raw: RawDiagnostic, tool_name: &str, rules: &[SeverityRule]) -> Diagnostic {
    let tool = raw.tool.unwrap_or_else(|| tool_name.to_string());
    let mut severity = raw
        .severity
        .map(|s| Severity::parse_lenient(&s))
        .unwrap_or(Severity::Warning);

    let mut message = raw.message.trim().to_string();
    if let Some(code) = &raw.code {
        message = strip_code_prefix(&message, code);
        if !message.starts_with(code.as_str()) {
            message = format!("{code} {message}").trim().to_string();
        }
    }

    let code_or_message = raw.code.as_deref().unwrap_or(&message);
    severity = apply_severity_rules(&tool, code_or_message, severity, rules);

    Diagnostic {
        file: raw.file,
        line: raw.line,
        column: raw.column,
        severity,
        message,
        tool,
        code: raw.code,
        group: raw.group,
        function: raw.function,
        hints: raw.hints,
        tags: raw.tags,
        meta: raw.meta,
    }
}

/// Strip a leading `{code}:`/`{code} -`/`{code},`/`[{code}]`/`({code})`
/// prefix from a message; the message is left alone if none matches.
fn strip_code_prefix(message: &str, code: &str) -> String {
    let trimmed = message.trim_start();
    let candidates = [
        format!("{code}:"),
        format!("{code} -"),
        format!("{code},"),
        format!("{code} "),
        format!("[{code}]"),
        format!("({code})"),
    ];
    for prefix in &candidates {
        if let Some(rest) = trimmed.strip_prefix(prefix.as_str()) {
            let stripped = rest.trim_start();
            if !stripped.is_empty() {
                return stripped.to_string();
            }
        }
    }
    message.to_string()
}
