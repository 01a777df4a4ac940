//! The orchestrator's run algorithm (spec §4.9 C10), grounded in
//! `pyqa/execution/orchestrator.py::Orchestrator.run` /
//! `pyqa/orchestration/orchestrator.py`: drives discovery (C4) → tool
//! selection (C6) → per-action preparation (C7) → cache lookup (C3) →
//! execution (C8, directly or via the worker pool) → the diagnostic
//! pipeline (C9), firing lifecycle hooks along the way.

use std::path::{Path, PathBuf};

use regex::Regex;

use qa_core::{
    AppResult, CatalogSnapshot, ExitCategory, RunConfig, RunResult, Tool, ToolAction, ToolContext, ToolOutcome,
};
use qa_diagnostics::severity_rules::{apply_severity_rules, SeverityRule};
use qa_diagnostics::{dedupe_outcomes, filter_suppressed, AnnotationProvider, NullAnnotationProvider};
use qa_executor::{execute, from_cache, prepare_command, resolve_parser, ExecutionOptions, InstalledSet, StrategyRegistry};
use qa_scheduler::{run_scheduled, Job};

use crate::environment::prime_environment;
use crate::hooks::OrchestratorHooks;
use crate::metrics::build_file_metrics;
use crate::versions::{load_versions, save_versions};

/// Drive one orchestration run to completion (spec §4.9 steps 1-10) against
/// a `NullAnnotationProvider` — equivalent to [`run_with_annotations`] for
/// callers with no richer semantic tagger to inject.
pub fn run(cfg: &RunConfig, snapshot: &CatalogSnapshot, hooks: &OrchestratorHooks) -> AppResult<RunResult> {
    run_with_annotations(cfg, snapshot, hooks, &NullAnnotationProvider)
}

/// As [`run`], but with an injectable `AnnotationProvider` for the
/// cross-tool dedup pass's semantic-overlap scoring (spec §4.8, §3 supplement
/// "issue-tag derivation").
pub fn run_with_annotations(
    cfg: &RunConfig,
    snapshot: &CatalogSnapshot,
    hooks: &OrchestratorHooks,
    annotations: &dyn AnnotationProvider,
) -> AppResult<RunResult> {
    let root = cfg.root.clone();

    // Step 1: prime environment, caller overrides win over auto-primed defaults.
    let mut base_env = prime_environment(&root);
    for (key, value) in &cfg.env {
        base_env.insert(key.clone(), value.clone());
    }

    // Step 2: discovery.
    let files = qa_discovery::DiscoveryService::default_pipeline().run(&cfg.file_discovery, &root);

    // Step 3: severity rules, cache context.
    let severity_rules = build_severity_rules(&cfg.severity_rules);
    let cache_dir = resolve_cache_dir(cfg, &root);
    let cache = cfg.cache_enabled.then(|| qa_cache::ResultCache::new(cache_dir.clone()));
    let tool_settings_json = serde_json::to_string(&cfg.tool_settings).ok();
    let token = qa_cache::compute_token(&qa_cache::TokenInputs {
        strict: cfg.strict,
        fix_only: cfg.fix_only,
        check_only: cfg.check_only,
        force_all: cfg.force_all,
        respect_config: cfg.respect_config,
        line_length: cfg.line_length,
        severity_rules: cfg.severity_rules.clone(),
        tool_settings_json,
    });
    let mut versions = load_versions(&cache_dir);
    let mut versions_dirty = false;

    // Step 4.
    hooks.fire_after_discovery(files.len());

    // Step 5: tool selection.
    let candidates = qa_selector::candidate_set(snapshot, &cfg.only, &cfg.languages, &cfg.detected_languages);
    let ordered_tools = qa_selector::order_tools(snapshot, &candidates);
    let total_actions = ordered_tools
        .iter()
        .filter_map(|name| snapshot.tool(name))
        .flat_map(|tool| tool.actions.iter())
        .filter(|action| cfg.action_allowed(action.is_fix))
        .count();
    hooks.fire_after_plan(total_actions);

    let registry = StrategyRegistry::new(cfg.jobs, cfg.line_length);
    let mut installed = InstalledSet::new();
    let mut order_counter: usize = 0;
    let mut all_outcomes: Vec<ToolOutcome> = Vec::new();
    let mut scheduled: Vec<Job> = Vec::new();
    let mut bail_triggered = false;

    // Step 6: per tool, per action.
    'tools: for tool_name in &ordered_tools {
        let Some(tool) = snapshot.tool(tool_name) else { continue };
        hooks.fire_before_tool(&tool.name);

        let tool_settings = cfg
            .tool_settings
            .get(&tool.name)
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        let relevant_files = filter_files_for_tool(&tool.file_extensions, &files);

        for action in &tool.actions {
            if !cfg.action_allowed(action.is_fix) {
                continue;
            }
            let order = order_counter;
            order_counter += 1;

            let ctx = ToolContext {
                cwd: root.clone(),
                env: base_env.clone(),
                files: relevant_files.clone(),
                settings: tool_settings.clone(),
            };

            let prepared = match prepare_command(tool, action, &ctx, &registry, cfg.use_local_linters, &mut installed) {
                Ok(prepared) => prepared,
                Err(err) => {
                    tracing::warn!(tool = %tool.name, action = %action.name, %err, "command preparation failed");
                    let outcome = error_outcome(&tool.name, &action.name, order, &err);
                    let bail_now = cfg.bail;
                    all_outcomes.push(outcome);
                    if bail_now {
                        bail_triggered = true;
                        break 'tools;
                    }
                    continue;
                }
            };

            if let Some(version) = &prepared.version {
                if versions.get(&tool.name) != Some(version) {
                    versions.insert(tool.name.clone(), version.clone());
                    versions_dirty = true;
                }
            }

            let resolved_parser = match resolve_parser(&registry, action.parser.as_ref()) {
                Ok(parser) => parser,
                Err(err) => {
                    tracing::warn!(tool = %tool.name, action = %action.name, %err, "parser resolution failed");
                    let outcome = error_outcome(&tool.name, &action.name, order, &err);
                    all_outcomes.push(outcome);
                    if cfg.bail {
                        bail_triggered = true;
                        break 'tools;
                    }
                    continue;
                }
            };
            let suppressions = compile_suppressions(tool, action);

            let mut cache_hit = false;
            if let Some(cache) = cache.as_ref() {
                if !cfg.force_all {
                    let request = qa_cache::CacheRequest {
                        tool: tool.name.clone(),
                        action: action.name.clone(),
                        command: prepared.argv.clone(),
                        files: relevant_files.clone(),
                        token: token.clone(),
                    };
                    if let Some(cached) = cache.load(&request) {
                        // Cached outcomes still pass through normalization+filter so
                        // severity rules and suppressions reflect the current run
                        // (spec §4.7 "the cache is only a skip gate for subprocess
                        // execution").
                        let reapplied: Vec<_> = cached
                            .outcome
                            .diagnostics
                            .into_iter()
                            .map(|mut diag| {
                                let code_or_message = diag.code.clone().unwrap_or_else(|| diag.message.clone());
                                diag.severity = apply_severity_rules(&diag.tool, &code_or_message, diag.severity, &severity_rules);
                                diag
                            })
                            .collect();
                        let diagnostics = filter_suppressed(reapplied, &suppressions);
                        let outcome = from_cache(&tool.name, &action.name, order, cached.outcome.returncode, diagnostics);
                        let is_failure = outcome.category != ExitCategory::Success;
                        all_outcomes.push(outcome);
                        cache_hit = true;
                        if cfg.bail && is_failure {
                            bail_triggered = true;
                            break 'tools;
                        }
                    }
                }
            }
            if cache_hit {
                continue;
            }

            if action.is_fix || cfg.bail {
                let options = ExecutionOptions {
                    parser: &resolved_parser,
                    suppressions: &suppressions,
                    severity_rules: &severity_rules,
                };
                let outcome = match execute(tool, action, &prepared, &ctx, order, &options) {
                    Ok(outcome) => outcome,
                    Err(err) => error_outcome(&tool.name, &action.name, order, &err),
                };
                if let Some(cache) = cache.as_ref() {
                    let request = qa_cache::CacheRequest {
                        tool: tool.name.clone(),
                        action: action.name.clone(),
                        command: prepared.argv.clone(),
                        files: relevant_files.clone(),
                        token: token.clone(),
                    };
                    let file_metrics = build_file_metrics(&relevant_files, &outcome.diagnostics);
                    cache.store(&request, &outcome, &file_metrics);
                }
                let bail_now = cfg.bail && outcome.category != ExitCategory::Success;
                all_outcomes.push(outcome);
                if bail_now {
                    bail_triggered = true;
                    break 'tools;
                }
            } else {
                let tool_name = tool.name.clone();
                let action_name = action.name.clone();
                let cache_ref = cache.as_ref();
                let severity_rules_ref = &severity_rules;
                let token_for_job = token.clone();
                scheduled.push(Job::new(order, move || {
                    let options = ExecutionOptions {
                        parser: &resolved_parser,
                        suppressions: &suppressions,
                        severity_rules: severity_rules_ref,
                    };
                    let outcome = match execute(tool, action, &prepared, &ctx, order, &options) {
                        Ok(outcome) => outcome,
                        Err(err) => error_outcome(&tool_name, &action_name, order, &err),
                    };
                    if let Some(cache) = cache_ref {
                        let request = qa_cache::CacheRequest {
                            tool: tool_name.clone(),
                            action: action_name.clone(),
                            command: prepared.argv.clone(),
                            files: ctx.files.clone(),
                            token: token_for_job,
                        };
                        let file_metrics = build_file_metrics(&ctx.files, &outcome.diagnostics);
                        cache.store(&request, &outcome, &file_metrics);
                    }
                    outcome
                }));
            }
        }
    }

    // Step 7: execute the scheduled (non-fix, non-bail) actions.
    let scheduled_outcomes = run_scheduled(cfg.jobs, cfg.bail, scheduled, |outcome| {
        outcome.category != ExitCategory::Success
    });
    if cfg.bail && scheduled_outcomes.iter().any(|o| o.category != ExitCategory::Success) {
        bail_triggered = true;
    }
    all_outcomes.extend(scheduled_outcomes);

    // Step 8: restore submission order regardless of which path an outcome
    // took (cache hit, synchronous, or scheduled).
    all_outcomes.sort_by_key(|outcome| outcome.order);
    for outcome in &all_outcomes {
        hooks.fire_after_tool(outcome);
    }

    // Step 9: build RunResult, dedupe, (external) annotation pass already
    // consulted by the dedupe call itself.
    dedupe_outcomes(&mut all_outcomes, &cfg.dedupe, annotations);
    let diagnostics: Vec<_> = all_outcomes.iter().flat_map(|o| o.diagnostics.clone()).collect();
    let file_metrics = build_file_metrics(&files, &diagnostics);
    let mut installed_tools: Vec<String> = installed.into_iter().collect();
    installed_tools.sort();

    let result = RunResult {
        outcomes: all_outcomes,
        diagnostics,
        file_metrics,
        bail_triggered,
        installed_tools,
    };

    // Step 10.
    if versions_dirty {
        save_versions(&cache_dir, &versions);
    }
    hooks.fire_after_execution(&result);
    Ok(result)
}

fn build_severity_rules(raw: &[String]) -> Vec<SeverityRule> {
    raw.iter()
        .filter_map(|rule| match SeverityRule::parse(rule) {
            Some(parsed) => Some(parsed),
            None => {
                tracing::warn!(rule = %rule, "skipping malformed severity rule");
                None
            }
        })
        .collect()
}

fn compile_suppressions(tool: &Tool, action: &ToolAction) -> Vec<Regex> {
    tool.diagnostics
        .suppressions
        .iter()
        .chain(action.filters.iter())
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(err) => {
                tracing::warn!(tool = %tool.name, action = %action.name, pattern = %pattern, %err, "skipping malformed suppression pattern");
                None
            }
        })
        .collect()
}

/// Narrow discovered files to the ones a tool's `file_extensions` claims,
/// matching either a full file name or a suffix (spec §4.5, grounded in
/// `pyqa/orchestration/runtime.py::filter_files_for_tool`). An empty list
/// means the tool processes every discovered file.
fn filter_files_for_tool(extensions: &[String], files: &[PathBuf]) -> Vec<PathBuf> {
    if extensions.is_empty() {
        return files.to_vec();
    }
    let patterns: Vec<String> = extensions.iter().map(|ext| ext.to_ascii_lowercase()).collect();
    files
        .iter()
        .filter(|file| {
            let name = file.file_name().map(|n| n.to_string_lossy().to_ascii_lowercase()).unwrap_or_default();
            if patterns.contains(&name) {
                return true;
            }
            let suffix = file.extension().map(|e| format!(".{}", e.to_string_lossy().to_ascii_lowercase()));
            suffix.is_some_and(|s| patterns.contains(&s))
        })
        .cloned()
        .collect()
}

/// Synthesize a tool-failure outcome for an error raised outside the normal
/// execution path (preparation, parser binding) — recorded rather than
/// propagated, matching `AppError::PreparationError`'s "becomes a failed
/// action record" contract (spec §4.6, §7).
fn error_outcome(tool: &str, action: &str, order: usize, err: &dyn std::fmt::Display) -> ToolOutcome {
    ToolOutcome {
        tool: tool.to_string(),
        action: action.to_string(),
        order,
        returncode: -1,
        stdout: String::new(),
        stderr: err.to_string(),
        duration: std::time::Duration::ZERO,
        diagnostics: Vec::new(),
        cached: false,
        timed_out: false,
        category: ExitCategory::ToolFailure,
    }
}

fn resolve_cache_dir(cfg: &RunConfig, root: &Path) -> PathBuf {
    if let Some(dir) = &cfg.cache_dir {
        return dir.clone();
    }
    directories::ProjectDirs::from("", "", "qa")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| root.join(".qa-cache"))
}
