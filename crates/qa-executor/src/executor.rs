//! Action executor (spec §4.7): spawns a prepared command, parses and
//! normalizes its output, classifies its exit, and logs failures — the steps
//! between "command is ready to run" and "outcome is ready to hand to the
//! scheduler" (grounded in `pyqa/execution/action_executor.py::run_action`).

use std::time::Instant;

use qa_core::{AppResult, ExitCategory, PreparedCommand, Severity, Tool, ToolAction, ToolContext, ToolOutcome};
use qa_diagnostics::severity_rules::SeverityRule;
use regex::Regex;

use crate::exit::classify;
use crate::failure_log::FailureRecord;
use crate::strategy::Parser;
#[cfg(test)]
use crate::strategy::StrategyRegistry;

/// Everything an action run needs beyond the prepared command itself: the
/// parser to scrape output with, suppression patterns, and severity rules —
/// assembled once per action by the orchestrator (via
/// [`crate::strategy::resolve_parser`]) and threaded through. The parser is
/// resolved ahead of time rather than looked up by id here, since
/// `parser.regex_lines` compiles a pattern private to this action and must
/// not be shared across concurrently running actions.
pub struct ExecutionOptions<'a> {
    pub parser: &'a dyn Parser,
    pub suppressions: &'a [Regex],
    pub severity_rules: &'a [SeverityRule],
}

/// Drop lines matching any suppression pattern before they ever reach the
/// parser (spec §4.7 step 3) — distinct from the later diagnostic-level
/// suppression pass (spec §4.8), which matches against a parsed
/// diagnostic's file/message rather than a raw output line.
fn filter_suppressed_lines<'a>(lines: std::str::Lines<'a>, patterns: &[Regex]) -> Vec<String> {
    lines
        .filter(|line| !patterns.iter().any(|pattern| pattern.is_match(line)))
        .map(str::to_string)
        .collect()
}

/// Run one prepared action to completion and produce its [`ToolOutcome`]
/// (spec §4.7 steps 1-8). `order` is the action's position in the schedule,
/// preserved on the outcome so downstream aggregation can restore
/// submission order regardless of completion order (spec §5).
pub fn execute(
    tool: &Tool,
    action: &ToolAction,
    command: &PreparedCommand,
    ctx: &ToolContext,
    order: usize,
    options: &ExecutionOptions,
) -> AppResult<ToolOutcome> {
    let start = Instant::now();
    let completed = qa_process::run(&command.argv, &command.cwd, &command.env, command.timeout)?;

    let stdout_lines = filter_suppressed_lines(completed.stdout.lines(), options.suppressions);
    let stderr_lines = filter_suppressed_lines(completed.stderr.lines(), options.suppressions);

    let raw_diagnostics = if completed.timed_out {
        Vec::new()
    } else {
        match options.parser.parse(&stdout_lines, &stderr_lines, ctx) {
            Ok(diags) => diags,
            Err(message) => {
                tracing::warn!(tool = %tool.name, action = %action.name, %message, "parser error; recording zero diagnostics for this action");
                Vec::new()
            }
        }
    };

    let normalized: Vec<_> = raw_diagnostics
        .into_iter()
        .map(|raw| qa_diagnostics::normalize(raw, &tool.name, options.severity_rules))
        .collect();
    let diagnostics = qa_diagnostics::filter_suppressed(normalized, options.suppressions);

    let (category, returncode) =
        classify(&tool.name, action, completed.returncode, completed.timed_out, diagnostics.len());

    if matches!(category, ExitCategory::ToolFailure) {
        let record = FailureRecord::new(
            &tool.name,
            &action.name,
            &command.argv,
            &command.cwd,
            &command.cwd,
            &ctx.files,
            diagnostics.len(),
            &completed.stdout,
            &completed.stderr,
            returncode,
        );
        record.log();
    }

    Ok(ToolOutcome {
        tool: tool.name.clone(),
        action: action.name.clone(),
        order,
        returncode,
        stdout: completed.stdout,
        stderr: completed.stderr,
        duration: start.elapsed(),
        diagnostics,
        cached: false,
        timed_out: completed.timed_out,
        category,
    })
}

/// Build a [`ToolOutcome`] from a cache hit, skipping execution entirely
/// (spec §4.3 "a cache hit replays its stored diagnostics verbatim").
pub fn from_cache(
    tool: &str,
    action: &str,
    order: usize,
    returncode: i32,
    diagnostics: Vec<qa_core::Diagnostic>,
) -> ToolOutcome {
    let category = if returncode == 0 {
        ExitCategory::Success
    } else if !diagnostics.is_empty() {
        ExitCategory::Diagnostic
    } else {
        ExitCategory::ToolFailure
    };
    ToolOutcome {
        tool: tool.to_string(),
        action: action.to_string(),
        order,
        returncode,
        stdout: String::new(),
        stderr: String::new(),
        duration: std::time::Duration::from_secs(0),
        diagnostics,
        cached: true,
        timed_out: false,
        category,
    }
}
