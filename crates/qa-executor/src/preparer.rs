//! Command preparer (spec §4.6): runtime resolution, version probing, and
//! `PreparedCommand` assembly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use qa_core::{AppError, AppResult, CommandSource, PreparedCommand, RuntimeKind, Tool, ToolAction, ToolContext};

use crate::strategy::StrategyRegistry;

/// Set of tools installed so far this run (spec §3 "ExecutionState ...
/// installed_tools"), consulted so the install step fires at most once per
/// tool per run.
pub type InstalledSet = std::collections::HashSet<String>;

/// Resolve `tool.runtime`'s preferred binary, walking up from `root` toward
/// the filesystem root looking for a project-local install (`.venv/bin` for
/// python, `node_modules/.bin` for npm) before falling back to `PATH`
/// (spec §4.6: "prefer a project-local binary ... otherwise prefer system
/// `PATH`, falling back to project-local").
fn local_candidate(tool: &Tool, root: &Path, program: &str) -> Option<PathBuf> {
    let kind = tool.runtime.as_ref()?.kind;
    let subdir = match kind {
        RuntimeKind::Python => PathBuf::from(".venv/bin"),
        RuntimeKind::Npm => PathBuf::from("node_modules/.bin"),
        _ => return None,
    };
    for ancestor in root.ancestors() {
        let candidate = ancestor.join(&subdir).join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Resolve the executable to run, returning the rewritten argv[0] and which
/// source it came from. Falls through to the bare program name (resolved on
/// `PATH` at spawn time by `qa_process`) when neither preference is found.
fn resolve_executable(tool: &Tool, root: &Path, program: &str, use_local_linters: bool) -> (String, CommandSource) {
    let system = which::which(program).ok();
    let local = local_candidate(tool, root, program);

    let (chosen, source) = if use_local_linters {
        local
            .clone()
            .map(|p| (p, CommandSource::Project))
            .or_else(|| system.clone().map(|p| (p, CommandSource::System)))
    } else {
        system
            .clone()
            .map(|p| (p, CommandSource::System))
            .or_else(|| local.clone().map(|p| (p, CommandSource::Project)))
    }
    .unwrap_or((PathBuf::from(program), CommandSource::System));

    (chosen.to_string_lossy().into_owned(), source)
}

/// Run `tool.runtime.version_command`, returning the first trimmed stdout
/// line, or `None` if unset or the probe fails (best-effort, per spec §4.6).
fn probe_version(tool: &Tool, root: &Path) -> Option<String> {
    let version_command = tool.runtime.as_ref()?.version_command.as_ref()?;
    let env = std::collections::BTreeMap::new();
    let output = qa_process::run(version_command, root, &env, Some(Duration::from_secs(10))).ok()?;
    output.stdout.lines().next().map(str::trim).map(str::to_string)
}

/// Produce a fully resolved [`PreparedCommand`] for one action
/// (spec §4.6). `installed` is mutated in place when an install step fires.
pub fn prepare_command(
    tool: &Tool,
    action: &ToolAction,
    ctx: &ToolContext,
    registry: &StrategyRegistry,
    use_local_linters: bool,
    installed: &mut InstalledSet,
) -> AppResult<PreparedCommand> {
    let builder = registry.command(&action.command.strategy).ok_or_else(|| AppError::PreparationError {
        tool: tool.name.clone(),
        action: action.name.clone(),
        message: format!("unbound command strategy '{}'", action.command.strategy),
    })?;

    let mut base_cmd = builder.build(ctx, &action.command.config).map_err(|err| match err {
        AppError::PreparationError { message, .. } => AppError::PreparationError {
            tool: tool.name.clone(),
            action: action.name.clone(),
            message,
        },
        other => other,
    })?;

    let Some(program) = base_cmd.first().cloned() else {
        return Err(AppError::PreparationError {
            tool: tool.name.clone(),
            action: action.name.clone(),
            message: "command strategy produced an empty argv".to_string(),
        });
    };

    let (resolved_program, source) = resolve_executable(tool, &ctx.cwd, &program, use_local_linters);
    base_cmd[0] = resolved_program;

    let version = probe_version(tool, &ctx.cwd);

    if let Some(runtime) = &tool.runtime {
        if runtime.install.is_some() && installed.insert(tool.name.clone()) {
            tracing::info!(tool = %tool.name, "installer strategy invocation is a no-op in this build (installer side effects are out of scope)");
        }
    }

    let mut env = action.env.clone();
    for (key, value) in &ctx.env {
        env.insert(key.clone(), value.clone());
    }

    Ok(PreparedCommand {
        argv: base_cmd,
        cwd: ctx.cwd.clone(),
        env,
        timeout: action.timeout_seconds.map(Duration::from_secs),
        version,
        source,
    })
}
