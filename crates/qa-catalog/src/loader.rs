//! Ties scanning, schema validation, fragment resolution, and strategy
//! binding into an immutable [`CatalogSnapshot`] (spec §4.1).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use qa_core::{AppError, AppResult, CatalogFragment, CatalogSnapshot, StrategyDefinition, Tool};
use serde_json::Value;

use crate::checksum::{compute_catalog_checksum, extend_checksum_with_payload};
use crate::merge::resolve_tool_mapping;
use crate::plugins::{merge_plugin_contributions, CatalogPlugin};
use crate::scanner::CatalogScanner;
use crate::schema::validate_document;
use crate::strategies::bind_strategies;

/// Loads a catalog rooted at `catalog_root`, validating documents against
/// schemas found under `schema_root`.
pub struct CatalogLoader {
    pub catalog_root: PathBuf,
    pub schema_root: PathBuf,
}

impl CatalogLoader {
    pub fn new(catalog_root: impl Into<PathBuf>, schema_root: impl Into<PathBuf>) -> Self {
        Self {
            catalog_root: catalog_root.into(),
            schema_root: schema_root.into(),
        }
    }

    pub fn load(&self) -> AppResult<CatalogSnapshot> {
        let scanner = CatalogScanner::new(&self.catalog_root);

        let tool_schema = self.read_schema("tool.schema.json")?;
        let strategy_schema = self.read_schema("strategy.schema.json")?;

        let fragment_paths = scanner.fragment_documents();
        let mut fragments_raw: BTreeMap<String, Value> = BTreeMap::new();
        let mut fragment_records = Vec::with_capacity(fragment_paths.len());
        for path in &fragment_paths {
            let name = fragment_name(path);
            let data = read_json(path)?;
            if fragments_raw.insert(name.clone(), data.clone()).is_some() {
                return Err(AppError::CatalogIntegrityError(format!(
                    "duplicate fragment name '{name}'"
                )));
            }
            fragment_records.push(CatalogFragment {
                name,
                data,
                source: path.clone(),
            });
        }

        let strategy_paths = scanner.strategy_documents();
        let mut strategies = Vec::with_capacity(strategy_paths.len());
        for path in &strategy_paths {
            let data = read_json(path)?;
            if let Some(schema) = &strategy_schema {
                validate_document(schema, &data, path)?;
            }
            let strategy: StrategyDefinition = serde_json::from_value(data).map_err(|err| {
                AppError::CatalogValidationError {
                    file: path.clone(),
                    message: err.to_string(),
                }
            })?;
            strategies.push(strategy);
        }
        let strategy_table = bind_strategies(&strategies)?;

        let tool_paths = scanner.tool_documents();
        let mut tools = Vec::with_capacity(tool_paths.len());
        let mut seen_names = std::collections::BTreeSet::new();
        for path in &tool_paths {
            let raw = read_json(path)?;
            let context = path.display().to_string();
            let resolved = resolve_tool_mapping(&raw, &context, &fragments_raw)?;
            if let Some(schema) = &tool_schema {
                validate_document(schema, &resolved, path)?;
            }
            let tool: Tool = serde_json::from_value(resolved).map_err(|err| {
                AppError::CatalogValidationError {
                    file: path.clone(),
                    message: err.to_string(),
                }
            })?;

            if !seen_names.insert(tool.name.clone()) {
                return Err(AppError::CatalogIntegrityError(format!(
                    "duplicate tool name '{}'",
                    tool.name
                )));
            }
            if !tool.disjoint_before_after() {
                return Err(AppError::CatalogIntegrityError(format!(
                    "tool '{}': before and after sets are not disjoint",
                    tool.name
                )));
            }
            for action in &tool.actions {
                crate::strategies::verify_reference_kind(
                    &strategy_table,
                    &action.command.strategy,
                    qa_core::StrategyKind::Command,
                    &format!("{}.{}", tool.name, action.name),
                )?;
                if let Some(parser) = &action.parser {
                    crate::strategies::verify_reference_kind(
                        &strategy_table,
                        &parser.strategy,
                        qa_core::StrategyKind::Parser,
                        &format!("{}.{}", tool.name, action.name),
                    )?;
                }
            }
            tools.push(tool);
        }

        let catalog_files = scanner.catalog_files();
        let checksum = compute_catalog_checksum(&self.catalog_root, &catalog_files)
            .map_err(|err| AppError::CatalogIntegrityError(format!("checksum failed: {err}")))?;

        Ok(CatalogSnapshot::new(tools, strategies, fragment_records, checksum))
    }

    /// As [`Self::load`], but folds in additional fragments/strategies/tools
    /// from registered plugin factories before sealing the snapshot (spec
    /// §4.1 "Plugin contributions"). A duplicate name — against the on-disk
    /// catalog or another plugin — is a [`AppError::CatalogIntegrityError`].
    /// The checksum incorporates the plugin payload via
    /// [`extend_checksum_with_payload`], so a plugin-augmented snapshot never
    /// collides with the base one.
    pub fn load_with_plugins(&self, plugins: &[Box<dyn CatalogPlugin>]) -> AppResult<CatalogSnapshot> {
        let base = self.load()?;
        if plugins.is_empty() {
            return Ok(base);
        }

        let mut tools = base.tools().to_vec();
        let mut strategies = base.strategies().to_vec();
        let mut fragments = base.fragments().to_vec();
        let payload = merge_plugin_contributions(plugins, &mut tools, &mut strategies, &mut fragments)?;

        for tool in &tools {
            if !tool.disjoint_before_after() {
                return Err(AppError::CatalogIntegrityError(format!(
                    "tool '{}': before and after sets are not disjoint",
                    tool.name
                )));
            }
        }
        let strategy_table = bind_strategies(&strategies)?;
        for tool in &tools {
            for action in &tool.actions {
                crate::strategies::verify_reference_kind(
                    &strategy_table,
                    &action.command.strategy,
                    qa_core::StrategyKind::Command,
                    &format!("{}.{}", tool.name, action.name),
                )?;
                if let Some(parser) = &action.parser {
                    crate::strategies::verify_reference_kind(
                        &strategy_table,
                        &parser.strategy,
                        qa_core::StrategyKind::Parser,
                        &format!("{}.{}", tool.name, action.name),
                    )?;
                }
            }
        }

        let checksum = extend_checksum_with_payload(base.checksum(), &payload);
        Ok(CatalogSnapshot::new(tools, strategies, fragments, checksum))
    }

    fn read_schema(&self, filename: &str) -> AppResult<Option<Value>> {
        let path = self.schema_root.join(filename);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(read_json(&path)?))
    }
}

fn fragment_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .trim_start_matches('_')
        .to_string()
}

fn read_json(path: &Path) -> AppResult<Value> {
    let contents = std::fs::read_to_string(path).map_err(|err| AppError::CatalogValidationError {
        file: path.to_path_buf(),
        message: format!("failed to read: {err}"),
    })?;
    serde_json::from_str(&contents).map_err(|err| AppError::CatalogValidationError {
        file: path.to_path_buf(),
        message: format!("invalid json: {err}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_load_minimal_catalog_without_schemas() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_root = dir.path().join("catalog");
        let schema_root = dir.path().join("schemas");

        write(
            &catalog_root.join("strategies/subprocess.json"),
            r#"{"schemaVersion":"1.0.0","id":"subprocess.argv","type":"command","implementation":"subprocess.argv"}"#,
        );
        write(
            &catalog_root.join("python/ruff.json"),
            r#"{
                "schemaVersion":"1.0.0",
                "name":"ruff",
                "description":"lint",
                "phase":"lint",
                "actions":[{"name":"lint","command":{"strategy":"subprocess.argv"}}]
            }"#,
        );

        let loader = CatalogLoader::new(&catalog_root, &schema_root);
        let snapshot = loader.load().unwrap();
        assert!(snapshot.tool("ruff").is_some());
        assert!(!snapshot.checksum().is_empty());
    }

    #[test]
    fn test_load_rejects_duplicate_tool_names() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_root = dir.path().join("catalog");
        let schema_root = dir.path().join("schemas");

        write(
            &catalog_root.join("strategies/subprocess.json"),
            r#"{"schemaVersion":"1.0.0","id":"subprocess.argv","type":"command","implementation":"subprocess.argv"}"#,
        );
        let tool_json = r#"{
            "schemaVersion":"1.0.0",
            "name":"ruff",
            "description":"lint",
            "phase":"lint",
            "actions":[{"name":"lint","command":{"strategy":"subprocess.argv"}}]
        }"#;
        write(&catalog_root.join("a/ruff.json"), tool_json);
        write(&catalog_root.join("b/ruff.json"), tool_json);

        let loader = CatalogLoader::new(&catalog_root, &schema_root);
        let err = loader.load().unwrap_err();
        assert!(matches!(err, AppError::CatalogIntegrityError(_)));
    }

    #[test]
    fn test_load_rejects_unbound_strategy_reference() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_root = dir.path().join("catalog");
        let schema_root = dir.path().join("schemas");

        write(
            &catalog_root.join("python/ruff.json"),
            r#"{
                "schemaVersion":"1.0.0",
                "name":"ruff",
                "description":"lint",
                "phase":"lint",
                "actions":[{"name":"lint","command":{"strategy":"missing.strategy"}}]
            }"#,
        );

        let loader = CatalogLoader::new(&catalog_root, &schema_root);
        let err = loader.load().unwrap_err();
        assert!(matches!(err, AppError::CatalogIntegrityError(_)));
    }

    #[test]
    fn test_fragment_name_strips_leading_underscore() {
        assert_eq!(fragment_name(Path::new("/catalog/_common.json")), "common");
    }

    struct ExtraTool;
    impl crate::plugins::CatalogPlugin for ExtraTool {
        fn name(&self) -> &str {
            "extra-tool-plugin"
        }
        fn contribute(&self) -> crate::plugins::PluginContribution {
            let tool: qa_core::Tool = serde_json::from_value(serde_json::json!({
                "schemaVersion": "1.0.0",
                "name": "from-plugin",
                "description": "contributed",
                "phase": "lint",
                "actions": [{"name": "lint", "command": {"strategy": "subprocess.argv"}}]
            }))
            .unwrap();
            crate::plugins::PluginContribution {
                tools: vec![tool],
                ..Default::default()
            }
        }
    }

    #[test]
    fn test_load_with_plugins_adds_tool_and_changes_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_root = dir.path().join("catalog");
        let schema_root = dir.path().join("schemas");
        write(
            &catalog_root.join("strategies/subprocess.json"),
            r#"{"schemaVersion":"1.0.0","id":"subprocess.argv","type":"command","implementation":"subprocess.argv"}"#,
        );
        write(
            &catalog_root.join("python/ruff.json"),
            r#"{
                "schemaVersion":"1.0.0",
                "name":"ruff",
                "description":"lint",
                "phase":"lint",
                "actions":[{"name":"lint","command":{"strategy":"subprocess.argv"}}]
            }"#,
        );

        let loader = CatalogLoader::new(&catalog_root, &schema_root);
        let base = loader.load().unwrap();

        let plugins: Vec<Box<dyn crate::plugins::CatalogPlugin>> = vec![Box::new(ExtraTool)];
        let augmented = loader.load_with_plugins(&plugins).unwrap();

        assert!(augmented.tool("from-plugin").is_some());
        assert!(augmented.tool("ruff").is_some());
        assert_ne!(augmented.checksum(), base.checksum());
    }

    #[test]
    fn test_load_with_plugins_rejects_duplicate_against_disk_tool() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_root = dir.path().join("catalog");
        let schema_root = dir.path().join("schemas");
        write(
            &catalog_root.join("strategies/subprocess.json"),
            r#"{"schemaVersion":"1.0.0","id":"subprocess.argv","type":"command","implementation":"subprocess.argv"}"#,
        );
        write(
            &catalog_root.join("python/from-plugin.json"),
            r#"{
                "schemaVersion":"1.0.0",
                "name":"from-plugin",
                "description":"lint",
                "phase":"lint",
                "actions":[{"name":"lint","command":{"strategy":"subprocess.argv"}}]
            }"#,
        );

        let loader = CatalogLoader::new(&catalog_root, &schema_root);
        let plugins: Vec<Box<dyn crate::plugins::CatalogPlugin>> = vec![Box::new(ExtraTool)];
        let err = loader.load_with_plugins(&plugins).unwrap_err();
        assert!(matches!(err, AppError::CatalogIntegrityError(_)));
    }
}
