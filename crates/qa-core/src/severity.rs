use serde::{Deserialize, Serialize};

/// Diagnostic severity, ranked low to high for dedup preference (spec §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Note,
    Notice,
    Warning,
    Error,
}

impl Severity {
    /// Parse a tool-native severity string, defaulting to `Warning` for anything unrecognized.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "error" | "err" | "fatal" => Severity::Error,
            "warning" | "warn" => Severity::Warning,
            "notice" => Severity::Notice,
            "note" | "info" | "hint" => Severity::Note,
            _ => Severity::Warning,
        }
    }

    pub fn rank(self) -> u8 {
        match self {
            Severity::Note => 0,
            Severity::Notice => 1,
            Severity::Warning => 2,
            Severity::Error => 3,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Notice => "notice",
            Severity::Note => "note",
        };
        f.write_str(s)
    }
}
