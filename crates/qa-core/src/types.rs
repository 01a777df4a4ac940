//! Catalog data model: tools, actions, strategies, fragments (spec §3, §4.1).

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Coarse execution bucket that orders entire groups of tools (spec §4.5).
///
/// `Other` carries any phase name not part of the canonical seven; such
/// phases are bucketed after the canonical ones, sorted lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Format,
    Lint,
    Analysis,
    Security,
    Test,
    Coverage,
    Utility,
    #[serde(untagged)]
    Other(String),
}

pub const PHASE_ORDER: [&str; 7] = [
    "format", "lint", "analysis", "security", "test", "coverage", "utility",
];

impl Phase {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "format" => Phase::Format,
            "lint" => Phase::Lint,
            "analysis" => Phase::Analysis,
            "security" => Phase::Security,
            "test" => Phase::Test,
            "coverage" => Phase::Coverage,
            "utility" => Phase::Utility,
            other => Phase::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Phase::Format => "format",
            Phase::Lint => "lint",
            Phase::Analysis => "analysis",
            Phase::Security => "security",
            Phase::Test => "test",
            Phase::Coverage => "coverage",
            Phase::Utility => "utility",
            Phase::Other(s) => s.as_str(),
        }
    }

    /// Canonical rank; `None` for phases outside the canonical seven — callers
    /// bucket those after all canonical phases, sorted lexicographically.
    pub fn canonical_rank(&self) -> Option<usize> {
        PHASE_ORDER.iter().position(|p| *p == self.as_str())
    }
}

/// Named, typed implementation slot kind (spec §3, §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StrategyKind {
    Command,
    Parser,
    Formatter,
    PostProcessor,
    Installer,
}

impl StrategyKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "command" => Some(StrategyKind::Command),
            "parser" => Some(StrategyKind::Parser),
            "formatter" => Some(StrategyKind::Formatter),
            "postProcessor" => Some(StrategyKind::PostProcessor),
            "installer" => Some(StrategyKind::Installer),
            _ => None,
        }
    }
}

/// Runtime family a tool is hosted under (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    Python,
    Npm,
    Binary,
    Go,
    Lua,
    Perl,
    Rust,
}

impl RuntimeKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "python" => Some(RuntimeKind::Python),
            "npm" => Some(RuntimeKind::Npm),
            "binary" => Some(RuntimeKind::Binary),
            "go" => Some(RuntimeKind::Go),
            "lua" => Some(RuntimeKind::Lua),
            "perl" => Some(RuntimeKind::Perl),
            "rust" => Some(RuntimeKind::Rust),
            _ => None,
        }
    }
}

/// Reference to a bound strategy plus its literal config blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyRef {
    pub strategy: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Runtime resolution metadata for a tool (spec §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeSpec {
    #[serde(rename = "type")]
    pub kind: RuntimeKind,
    #[serde(default)]
    pub version_command: Option<Vec<String>>,
    #[serde(default)]
    pub install: Option<StrategyRef>,
}

/// Three disjoint exit-code classification sets (spec §3, §4.7).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExitCodeSets {
    #[serde(default)]
    pub success: BTreeSet<i32>,
    #[serde(default)]
    pub diagnostic: BTreeSet<i32>,
    #[serde(default)]
    pub tool_failure: BTreeSet<i32>,
}

/// One invocation of a tool for a specific purpose (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolAction {
    pub name: String,
    pub command: StrategyRef,
    #[serde(default)]
    pub parser: Option<StrategyRef>,
    #[serde(default)]
    pub is_fix: bool,
    #[serde(default)]
    pub append_files: bool,
    #[serde(default)]
    pub ignore_exit: bool,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(default)]
    pub exit_codes: ExitCodeSets,
}

/// Documentation metadata carried alongside a tool definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentationBundle {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Tool-level diagnostic suppression configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticsBundle {
    #[serde(default)]
    pub suppressions: Vec<String>,
}

/// A named external program integrated via the catalog (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(deserialize_with = "deserialize_phase")]
    pub phase: Phase,
    #[serde(default)]
    pub before: BTreeSet<String>,
    #[serde(default)]
    pub after: BTreeSet<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub file_extensions: Vec<String>,
    #[serde(default)]
    pub config_files: Vec<String>,
    #[serde(default = "default_true")]
    pub default_enabled: bool,
    #[serde(default)]
    pub auto_install: bool,
    #[serde(default)]
    pub runtime: Option<RuntimeSpec>,
    pub actions: Vec<ToolAction>,
    #[serde(default)]
    pub options: serde_json::Value,
    #[serde(default)]
    pub diagnostics: DiagnosticsBundle,
    #[serde(default)]
    pub documentation: DocumentationBundle,
}

fn default_true() -> bool {
    true
}

fn deserialize_phase<'de, D>(deserializer: D) -> Result<Phase, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(Phase::parse(&raw))
}

impl Tool {
    /// `before ∩ after = ∅` invariant (spec §3).
    pub fn disjoint_before_after(&self) -> bool {
        self.before.is_disjoint(&self.after)
    }

    pub fn action(&self, name: &str) -> Option<&ToolAction> {
        self.actions.iter().find(|a| a.name == name)
    }
}

/// One field in a strategy's declared config schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfigField {
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

/// A named, typed implementation slot referenced by catalog entries (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: StrategyKind,
    pub implementation: String,
    #[serde(default)]
    pub config_schema: BTreeMap<String, StrategyConfigField>,
}

/// A reusable JSON partial referenced via a tool's `extends` list (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFragment {
    pub name: String,
    pub data: serde_json::Value,
    pub source: PathBuf,
}

/// Immutable bundle of `(tools, strategies, fragments, checksum)` (spec §3).
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    tools: Vec<Tool>,
    strategies: Vec<StrategyDefinition>,
    fragments: Vec<CatalogFragment>,
    checksum: String,
    tool_index: HashMap<String, usize>,
    strategy_index: HashMap<String, usize>,
}

impl CatalogSnapshot {
    /// Tools and strategies are sorted by name/id for deterministic iteration;
    /// callers must not rely on catalog-document discovery order.
    pub fn new(
        mut tools: Vec<Tool>,
        mut strategies: Vec<StrategyDefinition>,
        fragments: Vec<CatalogFragment>,
        checksum: String,
    ) -> Self {
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        strategies.sort_by(|a, b| a.id.cmp(&b.id));
        let tool_index = tools
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();
        let strategy_index = strategies
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        Self {
            tools,
            strategies,
            fragments,
            checksum,
            tool_index,
            strategy_index,
        }
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn strategies(&self) -> &[StrategyDefinition] {
        &self.strategies
    }

    pub fn fragments(&self) -> &[CatalogFragment] {
        &self.fragments
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn tool(&self, name: &str) -> Option<&Tool> {
        self.tool_index.get(name).map(|&i| &self.tools[i])
    }

    pub fn strategy(&self, id: &str) -> Option<&StrategyDefinition> {
        self.strategy_index.get(id).map(|&i| &self.strategies[i])
    }
}
