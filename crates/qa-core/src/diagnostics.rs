use serde::{Deserialize, Serialize};

use crate::severity::Severity;

/// Tool-native diagnostic payload prior to normalization (spec §3).
///
/// `severity` is a loose string here because tools emit arbitrary spellings;
/// normalization (see `qa-diagnostics`) coerces it into [`Severity`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDiagnostic {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    #[serde(default)]
    pub severity: Option<String>,
    pub message: String,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub meta: serde_json::Value,
}

impl RawDiagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            file: None,
            line: None,
            column: None,
            severity: None,
            message: message.into(),
            tool: None,
            code: None,
            group: None,
            function: None,
            hints: Vec::new(),
            tags: Vec::new(),
            meta: serde_json::Value::Null,
        }
    }
}

/// Canonical machine-readable lint finding (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub severity: Severity,
    pub message: String,
    pub tool: String,
    pub code: Option<String>,
    pub group: Option<String>,
    pub function: Option<String>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub meta: serde_json::Value,
}
