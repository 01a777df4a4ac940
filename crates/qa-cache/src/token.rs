//! Project fingerprint token and cache entry key derivation (spec §4.3).

use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Inputs that determine whether two runs may share cached outcomes.
/// Concatenated with `|` separators; `tool_settings_json`, when present, is
/// hashed (SHA-1, matching the original fingerprint scheme) rather than
/// embedded verbatim to keep the token short.
#[derive(Debug, Clone, Default)]
pub struct TokenInputs {
    pub strict: bool,
    pub fix_only: bool,
    pub check_only: bool,
    pub force_all: bool,
    pub respect_config: bool,
    pub line_length: u32,
    pub severity_rules: Vec<String>,
    pub tool_settings_json: Option<String>,
}

fn sha1_hex(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Build the project fingerprint token (spec §4.3).
pub fn compute_token(inputs: &TokenInputs) -> String {
    let mut rules = inputs.severity_rules.clone();
    rules.sort();

    let mut parts = vec![
        inputs.strict.to_string(),
        inputs.fix_only.to_string(),
        inputs.check_only.to_string(),
        inputs.force_all.to_string(),
        inputs.respect_config.to_string(),
        inputs.line_length.to_string(),
        rules.join(","),
    ];

    if let Some(settings_json) = &inputs.tool_settings_json {
        if !settings_json.is_empty() && settings_json != "{}" {
            parts.push(sha1_hex(settings_json.as_bytes()));
        }
    }

    parts.join("|")
}

/// Build the on-disk entry key: SHA-256 of
/// `tool || "::" || action || "::" || cmd_parts joined with NUL || "::" || token`.
pub fn entry_key(tool: &str, action: &str, cmd: &[String], token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tool.as_bytes());
    hasher.update(b"::");
    hasher.update(action.as_bytes());
    hasher.update(b"::");
    hasher.update(cmd.join("\0").as_bytes());
    hasher.update(b"::");
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
