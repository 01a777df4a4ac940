//! Plugin contribution support (spec §4.1 "Plugin contributions").
//!
//! A registered factory may hand the loader additional fragments, strategies,
//! or tools after the on-disk catalog has been scanned, validated, and bound.
//! Contributions are merged under the same integrity rules as on-disk
//! documents — a duplicate name is fatal — and folded into the checksum so a
//! snapshot built with a given plugin set never collides with one built
//! without it.

use qa_core::{AppError, AppResult, CatalogFragment, StrategyDefinition, Tool};
use serde::Serialize;

/// A registered source of additional catalog content, consulted once per
/// load after the base catalog tree has been resolved.
pub trait CatalogPlugin {
    /// Stable identifier used in integrity-error messages; not merged into
    /// any catalog namespace itself.
    fn name(&self) -> &str;

    fn contribute(&self) -> PluginContribution;
}

/// Additional catalog content handed back by a [`CatalogPlugin`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct PluginContribution {
    #[serde(default)]
    pub fragments: Vec<CatalogFragment>,
    #[serde(default)]
    pub strategies: Vec<StrategyDefinition>,
    #[serde(default)]
    pub tools: Vec<Tool>,
}

/// Fold every plugin's contribution into the base collections in place,
/// rejecting any name already present — on disk or from an earlier plugin —
/// as a [`AppError::CatalogIntegrityError`]. Returns a canonical JSON payload
/// of everything contributed, for checksum combination.
pub fn merge_plugin_contributions(
    plugins: &[Box<dyn CatalogPlugin>],
    tools: &mut Vec<Tool>,
    strategies: &mut Vec<StrategyDefinition>,
    fragments: &mut Vec<CatalogFragment>,
) -> AppResult<serde_json::Value> {
    let mut payloads = Vec::with_capacity(plugins.len());
    for plugin in plugins {
        let contribution = plugin.contribute();
        for tool in &contribution.tools {
            if tools.iter().any(|t| t.name == tool.name) {
                return Err(AppError::CatalogIntegrityError(format!(
                    "plugin '{}' contributed duplicate tool name '{}'",
                    plugin.name(),
                    tool.name
                )));
            }
        }
        for strategy in &contribution.strategies {
            if strategies.iter().any(|s| s.id == strategy.id) {
                return Err(AppError::CatalogIntegrityError(format!(
                    "plugin '{}' contributed duplicate strategy id '{}'",
                    plugin.name(),
                    strategy.id
                )));
            }
        }
        for fragment in &contribution.fragments {
            if fragments.iter().any(|f| f.name == fragment.name) {
                return Err(AppError::CatalogIntegrityError(format!(
                    "plugin '{}' contributed duplicate fragment name '{}'",
                    plugin.name(),
                    fragment.name
                )));
            }
        }
        payloads.push(serde_json::json!({"plugin": plugin.name(), "contribution": &contribution}));
        tools.extend(contribution.tools);
        strategies.extend(contribution.strategies);
        fragments.extend(contribution.fragments);
    }
    Ok(serde_json::Value::Array(payloads))
}

#[cfg(test)]
mod tests {
    use super::*;
    use qa_core::{DiagnosticsBundle, DocumentationBundle, ExitCodeSets, Phase, StrategyRef, ToolAction};
    use std::collections::BTreeMap;

    fn tool(name: &str) -> Tool {
        Tool {
            name: name.to_string(),
            description: String::new(),
            aliases: vec![],
            phase: Phase::Lint,
            before: Default::default(),
            after: Default::default(),
            languages: vec![],
            file_extensions: vec![],
            config_files: vec![],
            default_enabled: true,
            auto_install: false,
            runtime: None,
            actions: vec![ToolAction {
                name: "lint".to_string(),
                command: StrategyRef {
                    strategy: "subprocess.argv".to_string(),
                    config: serde_json::Value::Null,
                },
                parser: None,
                is_fix: false,
                append_files: true,
                ignore_exit: false,
                timeout_seconds: None,
                env: BTreeMap::new(),
                filters: vec![],
                exit_codes: ExitCodeSets::default(),
            }],
            options: serde_json::Value::Null,
            diagnostics: DiagnosticsBundle::default(),
            documentation: DocumentationBundle::default(),
        }
    }

    struct Adder(Tool);
    impl CatalogPlugin for Adder {
        fn name(&self) -> &str {
            "adder"
        }
        fn contribute(&self) -> PluginContribution {
            PluginContribution {
                tools: vec![self.0.clone()],
                ..Default::default()
            }
        }
    }

    #[test]
    fn test_merge_plugin_contribution_adds_tool() {
        let mut tools = vec![];
        let mut strategies = vec![];
        let mut fragments = vec![];
        let plugins: Vec<Box<dyn CatalogPlugin>> = vec![Box::new(Adder(tool("extra")))];
        let payload = merge_plugin_contributions(&plugins, &mut tools, &mut strategies, &mut fragments).unwrap();
        assert_eq!(tools.len(), 1);
        assert!(payload.is_array());
    }

    #[test]
    fn test_merge_plugin_contribution_rejects_duplicate_tool_name() {
        let mut tools = vec![tool("ruff")];
        let mut strategies = vec![];
        let mut fragments = vec![];
        let plugins: Vec<Box<dyn CatalogPlugin>> = vec![Box::new(Adder(tool("ruff")))];
        let err = merge_plugin_contributions(&plugins, &mut tools, &mut strategies, &mut fragments).unwrap_err();
        assert!(matches!(err, AppError::CatalogIntegrityError(_)));
    }
}
