//! Exit-code classification (spec §4.7 step 6), grounded in
//! `pyqa/execution/action_executor.py::_adjust_returncode`.
//!
//! Tools that use their exit code to mean "found something" rather than
//! "something went wrong" need their raw returncode reinterpreted before
//! `ToolOutcome::is_failure` sees it. The rules, in order:
//!
//! 1. A timed-out process is never anything but a failure.
//! 2. If `action.exit_codes` names the returncode explicitly, that wins.
//! 3. `pylint` and `tombi`-style tools encode a bitmask of finding
//!    categories in their exit status; any nonzero code with diagnostics
//!    present is "diagnostic", not "tool failure".
//! 4. A fix action that exits 1 after rewriting files (common for formatters
//!    that signal "changes were made") is success, not failure.
//! 5. `ignore_exit` with no diagnostics collapses returncode 1 to success —
//!    some tools exit 1 on an empty match set.

use qa_core::{ExitCategory, ToolAction};

/// Tool names whose exit code is a bitmask/category encoding rather than a
/// plain 0-success convention (spec §4.7 step 6, "pylint/tombi-style").
const BITMASK_EXIT_TOOLS: &[&str] = &["pylint", "tombi"];

/// Classify one completed action's returncode into an [`ExitCategory`],
/// returning the (possibly reinterpreted) returncode to record alongside it.
pub fn classify(
    tool_name: &str,
    action: &ToolAction,
    returncode: i32,
    timed_out: bool,
    diagnostic_count: usize,
) -> (ExitCategory, i32) {
    if timed_out {
        return (ExitCategory::ToolFailure, returncode);
    }

    if action.exit_codes.success.contains(&returncode) {
        return (ExitCategory::Success, returncode);
    }
    if action.exit_codes.diagnostic.contains(&returncode) {
        return (ExitCategory::Diagnostic, returncode);
    }
    if action.exit_codes.tool_failure.contains(&returncode) {
        return (ExitCategory::ToolFailure, returncode);
    }

    if returncode == 0 {
        return (ExitCategory::Success, 0);
    }

    if BITMASK_EXIT_TOOLS.contains(&tool_name) && diagnostic_count > 0 {
        return (ExitCategory::Diagnostic, returncode);
    }

    if action.is_fix && returncode == 1 {
        return (ExitCategory::Success, 0);
    }

    if action.ignore_exit && returncode == 1 && diagnostic_count == 0 {
        return (ExitCategory::Success, 0);
    }

    if diagnostic_count > 0 {
        return (ExitCategory::Diagnostic, returncode);
    }

    (ExitCategory::ToolFailure, returncode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qa_core::{ExitCodeSets, StrategyRef};
    use std::collections::BTreeMap;

    fn action(is_fix: bool, ignore_exit: bool, exit_codes: ExitCodeSets) -> ToolAction {
        ToolAction {
            name: "lint".to_string(),
            command: StrategyRef {
                strategy: "subprocess.argv".to_string(),
                config: serde_json::Value::Null,
            },
            parser: None,
            is_fix,
            append_files: true,
            ignore_exit,
            timeout_seconds: None,
            env: BTreeMap::new(),
            filters: vec![],
            exit_codes,
        }
    }

    #[test]
    fn test_classify_timeout_always_tool_failure() {
        let a = action(false, false, ExitCodeSets::default());
        let (cat, code) = classify("ruff", &a, 0, true, 0);
        assert_eq!(cat, ExitCategory::ToolFailure);
        assert_eq!(code, 0);
    }

    #[test]
    fn test_classify_explicit_success_set_wins() {
        let mut sets = ExitCodeSets::default();
        sets.success.insert(1);
        let a = action(false, false, sets);
        let (cat, code) = classify("weirdtool", &a, 1, false, 0);
        assert_eq!(cat, ExitCategory::Success);
        assert_eq!(code, 1);
    }

    #[test]
    fn test_classify_zero_is_success() {
        let a = action(false, false, ExitCodeSets::default());
        let (cat, code) = classify("ruff", &a, 0, false, 0);
        assert_eq!(cat, ExitCategory::Success);
        assert_eq!(code, 0);
    }

    #[test]
    fn test_classify_pylint_bitmask_with_diagnostics_is_diagnostic_not_failure() {
        let a = action(false, false, ExitCodeSets::default());
        let (cat, _) = classify("pylint", &a, 30, false, 4);
        assert_eq!(cat, ExitCategory::Diagnostic);
    }

    #[test]
    fn test_classify_pylint_bitmask_without_diagnostics_is_failure() {
        let a = action(false, false, ExitCodeSets::default());
        let (cat, _) = classify("pylint", &a, 32, false, 0);
        assert_eq!(cat, ExitCategory::ToolFailure);
    }

    #[test]
    fn test_classify_fix_action_exit_1_collapses_to_success() {
        let a = action(true, false, ExitCodeSets::default());
        let (cat, code) = classify("black", &a, 1, false, 0);
        assert_eq!(cat, ExitCategory::Success);
        assert_eq!(code, 0);
    }

    #[test]
    fn test_classify_ignore_exit_with_no_diagnostics_collapses_to_success() {
        let a = action(false, true, ExitCodeSets::default());
        let (cat, code) = classify("grep-tool", &a, 1, false, 0);
        assert_eq!(cat, ExitCategory::Success);
        assert_eq!(code, 0);
    }

    #[test]
    fn test_classify_ignore_exit_with_diagnostics_stays_diagnostic() {
        let a = action(false, true, ExitCodeSets::default());
        let (cat, _) = classify("grep-tool", &a, 1, false, 2);
        assert_eq!(cat, ExitCategory::Diagnostic);
    }

    #[test]
    fn test_classify_nonzero_with_diagnostics_is_diagnostic() {
        let a = action(false, false, ExitCodeSets::default());
        let (cat, _) = classify("ruff", &a, 1, false, 3);
        assert_eq!(cat, ExitCategory::Diagnostic);
    }

    #[test]
    fn test_classify_nonzero_no_diagnostics_is_tool_failure() {
        let a = action(false, false, ExitCodeSets::default());
        let (cat, _) = classify("ruff", &a, 2, false, 0);
        assert_eq!(cat, ExitCategory::ToolFailure);
    }
}
