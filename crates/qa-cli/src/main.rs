//! Thin binary wiring catalog loading and the orchestrator together for
//! manual, from-a-shell runs. Not the full CLI surface described as
//! out-of-scope by the spec — just enough `clap` glue to drive one run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use qa_orchestrator::OrchestratorHooks;

/// Run the polyglot lint/format/analysis orchestrator against a project root.
#[derive(Parser)]
#[command(name = "qa", version, about = "Polyglot lint/format/analysis orchestrator")]
struct Cli {
    /// Project root to discover files and run tools under (defaults to CWD)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Directory holding tool/strategy catalog documents
    #[arg(long, default_value = "catalog")]
    catalog_root: PathBuf,

    /// Directory holding the catalog's JSON Schema documents
    #[arg(long, default_value = "catalog/schemas")]
    schema_root: PathBuf,

    /// Restrict the run to these tool names (repeatable)
    #[arg(long = "only")]
    only: Vec<String>,

    /// Restrict the run to these detected languages (repeatable)
    #[arg(long = "language")]
    languages: Vec<String>,

    /// Stop scheduling new actions after the first failing outcome
    #[arg(long)]
    bail: bool,

    /// Treat warnings as failures
    #[arg(long)]
    strict: bool,

    /// Run only fix actions
    #[arg(long, conflicts_with = "check_only")]
    fix_only: bool,

    /// Run only check (non-fix) actions
    #[arg(long, conflicts_with = "fix_only")]
    check_only: bool,

    /// Ignore the result cache and re-run every action
    #[arg(long)]
    force_all: bool,

    /// Disable the result cache entirely
    #[arg(long)]
    no_cache: bool,

    /// Override the result cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Number of worker threads for concurrent actions
    #[arg(long)]
    jobs: Option<usize>,

    /// Max line length passed to strategies that honor it
    #[arg(long, default_value_t = 88)]
    line_length: u32,

    /// Print the resulting diagnostics as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();
    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("resolving current directory")?,
    };

    let snapshot = qa_catalog::CatalogLoader::new(&cli.catalog_root, &cli.schema_root)
        .load()
        .context("loading tool/strategy catalog")?;

    let mut cfg = qa_core::RunConfig::new(root);
    cfg.only = cli.only;
    cfg.languages = cli.languages;
    cfg.bail = cli.bail;
    cfg.strict = cli.strict;
    cfg.fix_only = cli.fix_only;
    cfg.check_only = cli.check_only;
    cfg.force_all = cli.force_all;
    cfg.cache_enabled = !cli.no_cache;
    cfg.cache_dir = cli.cache_dir;
    cfg.line_length = cli.line_length;
    if let Some(jobs) = cli.jobs {
        cfg.jobs = jobs.max(1);
    }

    let hooks = OrchestratorHooks {
        before_tool: Some(Box::new(|name| tracing::info!(tool = %name, "starting"))),
        after_tool: Some(Box::new(|outcome| {
            tracing::info!(
                tool = %outcome.tool,
                action = %outcome.action,
                category = ?outcome.category,
                diagnostics = outcome.diagnostics.len(),
                "finished"
            );
        })),
        after_discovery: Some(Box::new(|count| tracing::info!(files = count, "discovery complete"))),
        ..OrchestratorHooks::default()
    };

    let result = qa_orchestrator::run(&cfg, &snapshot, &hooks).context("running orchestrator")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&to_json(&result))?);
    } else {
        for diag in &result.diagnostics {
            let location = match (&diag.file, diag.line) {
                (Some(file), Some(line)) => format!("{}:{line}", file.display()),
                (Some(file), None) => file.display().to_string(),
                (None, _) => "<unknown>".to_string(),
            };
            println!("{location}: {:?}: [{}] {}", diag.severity, diag.tool, diag.message);
        }
        if result.bail_triggered {
            eprintln!("run stopped early: --bail triggered after a failing outcome");
        }
    }

    std::process::exit(result.exit_code());
}

/// Minimal JSON projection of a [`qa_core::RunResult`] for `--json` output.
/// Not a stable wire format — just enough structure for manual inspection.
fn to_json(result: &qa_core::RunResult) -> serde_json::Value {
    serde_json::json!({
        "exit_code": result.exit_code(),
        "bail_triggered": result.bail_triggered,
        "installed_tools": result.installed_tools,
        "diagnostics": result.diagnostics.iter().map(|d| serde_json::json!({
            "file": d.file,
            "line": d.line,
            "column": d.column,
            "severity": format!("{:?}", d.severity),
            "tool": d.tool,
            "code": d.code,
            "message": d.message,
        })).collect::<Vec<_>>(),
        "outcomes": result.outcomes.iter().map(|o| serde_json::json!({
            "tool": o.tool,
            "action": o.action,
            "returncode": o.returncode,
            "category": format!("{:?}", o.category),
            "cached": o.cached,
            "timed_out": o.timed_out,
        })).collect::<Vec<_>>(),
    })
}
