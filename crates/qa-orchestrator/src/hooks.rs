//! Orchestration lifecycle hooks (spec §4.9), grounded in
//! `pyqa/execution/orchestrator.py::OrchestratorHooks`.

use qa_core::ToolOutcome;

/// Optional callbacks a caller can register to observe a run in progress.
/// Every field defaults to a no-op so embedding `Orchestrator` never
/// requires wiring callbacks it doesn't need.
#[derive(Default)]
pub struct OrchestratorHooks<'a> {
    /// Called once per tool, before any of its actions are prepared.
    pub before_tool: Option<Box<dyn Fn(&str) + 'a>>,
    /// Called once per completed outcome (cache hit or executed), in final
    /// `order` sequence, after the whole run's jobs have been collected.
    pub after_tool: Option<Box<dyn Fn(&ToolOutcome) + 'a>>,
    /// Called once discovery has produced the final file list.
    pub after_discovery: Option<Box<dyn Fn(usize) + 'a>>,
    /// Called once tool selection has produced the full schedule, with the
    /// total number of actions about to run (cached or not).
    pub after_plan: Option<Box<dyn Fn(usize) + 'a>>,
    /// Called once with the finished `RunResult`, after dedup and the
    /// annotation pass, before tool versions are persisted.
    pub after_execution: Option<Box<dyn Fn(&qa_core::RunResult) + 'a>>,
}

impl<'a> OrchestratorHooks<'a> {
    pub fn fire_before_tool(&self, tool: &str) {
        if let Some(hook) = &self.before_tool {
            hook(tool);
        }
    }

    pub fn fire_after_tool(&self, outcome: &ToolOutcome) {
        if let Some(hook) = &self.after_tool {
            hook(outcome);
        }
    }

    pub fn fire_after_discovery(&self, file_count: usize) {
        if let Some(hook) = &self.after_discovery {
            hook(file_count);
        }
    }

    pub fn fire_after_plan(&self, total_actions: usize) {
        if let Some(hook) = &self.after_plan {
            hook(total_actions);
        }
    }

    pub fn fire_after_execution(&self, result: &qa_core::RunResult) {
        if let Some(hook) = &self.after_execution {
            hook(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_default_hooks_are_noop() {
        let hooks = OrchestratorHooks::default();
        hooks.fire_before_tool("ruff");
        hooks.fire_after_discovery(3);
    }

    #[test]
    fn test_registered_hook_fires() {
        let seen = RefCell::new(Vec::new());
        let hooks = OrchestratorHooks {
            before_tool: Some(Box::new(|name| seen.borrow_mut().push(name.to_string()))),
            ..OrchestratorHooks::default()
        };
        hooks.fire_before_tool("ruff");
        hooks.fire_before_tool("eslint");
        assert_eq!(seen.into_inner(), vec!["ruff".to_string(), "eslint".to_string()]);
    }
}
