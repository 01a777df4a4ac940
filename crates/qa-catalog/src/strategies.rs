//! Strategy binding (spec §3, §4.1).
//!
//! The original notion of "importable and callable" implementation attributes
//! has no analogue in a statically compiled binary; here a strategy document's
//! `implementation` string is bound against a static registry of known
//! implementation names built into this crate. An unregistered name fails
//! catalog load exactly as an import failure would.

use std::collections::BTreeMap;

use qa_core::{AppError, StrategyDefinition, StrategyKind};

/// Implementation names this build knows how to execute, grouped by kind.
/// Real deployments extend this list as new command/parser/formatter/
/// postProcessor/installer strategies are added to the engine.
pub fn known_implementations(kind: StrategyKind) -> &'static [&'static str] {
    match kind {
        StrategyKind::Command => &["subprocess.argv", "subprocess.shell_template"],
        StrategyKind::Parser => &["parser.json_lines", "parser.regex_lines", "parser.passthrough"],
        StrategyKind::Formatter => &["formatter.in_place"],
        StrategyKind::PostProcessor => &["post_processor.noop"],
        StrategyKind::Installer => &["installer.pip", "installer.npm", "installer.binary_fetch"],
    }
}

/// Verify every strategy document's `implementation` is a registered name for
/// its declared kind. Returns the validated table keyed by id for O(1) lookup.
pub fn bind_strategies(
    strategies: &[StrategyDefinition],
) -> Result<BTreeMap<String, StrategyDefinition>, AppError> {
    let mut table = BTreeMap::new();
    for strategy in strategies {
        if table.contains_key(&strategy.id) {
            return Err(AppError::CatalogIntegrityError(format!(
                "duplicate strategy id '{}'",
                strategy.id
            )));
        }
        if !known_implementations(strategy.kind).contains(&strategy.implementation.as_str()) {
            return Err(AppError::CatalogIntegrityError(format!(
                "strategy '{}' references unknown {:?} implementation '{}'",
                strategy.id, strategy.kind, strategy.implementation
            )));
        }
        table.insert(strategy.id.clone(), strategy.clone());
    }
    Ok(table)
}

/// Verify a `{strategy}` reference at a command/parser/installer slot exists
/// and its kind matches the slot it's used at.
pub fn verify_reference_kind(
    table: &BTreeMap<String, StrategyDefinition>,
    strategy_id: &str,
    expected_kind: StrategyKind,
    context: &str,
) -> Result<(), AppError> {
    let strategy = table.get(strategy_id).ok_or_else(|| {
        AppError::CatalogIntegrityError(format!(
            "{context}: unknown strategy '{strategy_id}'"
        ))
    })?;
    if strategy.kind != expected_kind {
        return Err(AppError::CatalogIntegrityError(format!(
            "{context}: strategy '{strategy_id}' is {:?}, expected {:?}",
            strategy.kind, expected_kind
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qa_core::StrategyConfigField;

    fn strategy(id: &str, kind: StrategyKind, implementation: &str) -> StrategyDefinition {
        StrategyDefinition {
            id: id.to_string(),
            kind,
            implementation: implementation.to_string(),
            config_schema: BTreeMap::<String, StrategyConfigField>::new(),
        }
    }

    #[test]
    fn test_bind_strategies_accepts_known_implementation() {
        let strategies = vec![strategy("subprocess", StrategyKind::Command, "subprocess.argv")];
        let table = bind_strategies(&strategies).unwrap();
        assert!(table.contains_key("subprocess"));
    }

    #[test]
    fn test_bind_strategies_rejects_unknown_implementation() {
        let strategies = vec![strategy("weird", StrategyKind::Command, "not.registered")];
        let err = bind_strategies(&strategies).unwrap_err();
        assert!(matches!(err, AppError::CatalogIntegrityError(_)));
    }

    #[test]
    fn test_bind_strategies_rejects_duplicate_id() {
        let strategies = vec![
            strategy("dup", StrategyKind::Command, "subprocess.argv"),
            strategy("dup", StrategyKind::Parser, "parser.passthrough"),
        ];
        let err = bind_strategies(&strategies).unwrap_err();
        assert!(matches!(err, AppError::CatalogIntegrityError(_)));
    }

    #[test]
    fn test_verify_reference_kind_mismatch() {
        let strategies = vec![strategy("subprocess", StrategyKind::Command, "subprocess.argv")];
        let table = bind_strategies(&strategies).unwrap();
        let err = verify_reference_kind(&table, "subprocess", StrategyKind::Parser, "ruff.lint")
            .unwrap_err();
        assert!(matches!(err, AppError::CatalogIntegrityError(_)));
    }

    #[test]
    fn test_verify_reference_kind_missing() {
        let table = BTreeMap::new();
        let err = verify_reference_kind(&table, "ghost", StrategyKind::Command, "ruff.lint")
            .unwrap_err();
        assert!(matches!(err, AppError::CatalogIntegrityError(_)));
    }
}
