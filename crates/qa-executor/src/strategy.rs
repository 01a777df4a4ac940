//! Command/parser strategy traits and their built-in implementations.
//!
//! The catalog's `strategy` references (spec §3, §4.1 "Strategy binding")
//! resolve, in a statically compiled binary, to one of these registered
//! implementations rather than an imported Python callable. Per-tool
//! strategies (the concrete ESLint command builder, say) are an external
//! collaborator per spec §1 — this crate only ships the generic,
//! catalog-driven implementations every tool's `strategies/*.json` document
//! can reference by id (`subprocess.argv`, `parser.regex_lines`, …), mirroring
//! `qa_catalog::strategies::known_implementations`.

use std::collections::BTreeMap;

use qa_core::{AppError, AppResult, ToolContext};
use regex::Regex;

/// Builds the base argv for one action (spec §4.6 "`base_cmd = action.build_command(ctx)`").
pub trait CommandBuilder: Send + Sync {
    fn build(&self, ctx: &ToolContext, config: &serde_json::Value) -> AppResult<Vec<String>>;
}

/// Turns captured stdout/stderr lines into raw diagnostics (spec §4.7 step 4).
pub trait Parser: Send + Sync {
    fn parse(
        &self,
        stdout: &[String],
        stderr: &[String],
        ctx: &ToolContext,
    ) -> Result<Vec<qa_core::RawDiagnostic>, String>;
}

/// `subprocess.argv`: a literal argv template from `config.argv`, with
/// `{root}` substituted and discovered files appended when `append_files`.
pub struct ArgvCommandBuilder {
    pub append_files: bool,
}

impl CommandBuilder for ArgvCommandBuilder {
    fn build(&self, ctx: &ToolContext, config: &serde_json::Value) -> AppResult<Vec<String>> {
        let template = config
            .get("argv")
            .and_then(|v| v.as_array())
            .ok_or_else(|| AppError::PreparationError {
                tool: String::new(),
                action: String::new(),
                message: "subprocess.argv strategy requires a config.argv array".to_string(),
            })?;

        let mut argv = Vec::with_capacity(template.len() + ctx.files.len());
        for entry in template {
            let token = entry.as_str().ok_or_else(|| AppError::PreparationError {
                tool: String::new(),
                action: String::new(),
                message: "subprocess.argv entries must be strings".to_string(),
            })?;
            argv.push(token.replace("{root}", &ctx.cwd.to_string_lossy()));
        }
        if self.append_files {
            argv.extend(ctx.files.iter().map(|p| p.to_string_lossy().into_owned()));
        }
        Ok(argv)
    }
}

/// `subprocess.shell_template`: a whitespace-tokenized template string with
/// `{root}`/`{jobs}`/`{line_length}` placeholders, never passed to a shell —
/// this strategy only *builds* the argv; `qa_process::run` still execs it
/// directly (spec §4.2 "never invokes a shell").
pub struct ShellTemplateCommandBuilder {
    pub append_files: bool,
    pub jobs: usize,
    pub line_length: u32,
}

impl CommandBuilder for ShellTemplateCommandBuilder {
    fn build(&self, ctx: &ToolContext, config: &serde_json::Value) -> AppResult<Vec<String>> {
        let template = config.get("template").and_then(|v| v.as_str()).ok_or_else(|| {
            AppError::PreparationError {
                tool: String::new(),
                action: String::new(),
                message: "subprocess.shell_template strategy requires a config.template string"
                    .to_string(),
            }
        })?;

        let substituted = template
            .replace("{root}", &ctx.cwd.to_string_lossy())
            .replace("{jobs}", &self.jobs.to_string())
            .replace("{line_length}", &self.line_length.to_string());

        let mut argv: Vec<String> = substituted.split_whitespace().map(str::to_string).collect();
        if self.append_files {
            argv.extend(ctx.files.iter().map(|p| p.to_string_lossy().into_owned()));
        }
        Ok(argv)
    }
}

/// `parser.passthrough`: tools that report findings purely through their exit
/// code (no structured output to scrape) parse to zero diagnostics.
pub struct PassthroughParser;

impl Parser for PassthroughParser {
    fn parse(
        &self,
        _stdout: &[String],
        _stderr: &[String],
        _ctx: &ToolContext,
    ) -> Result<Vec<qa_core::RawDiagnostic>, String> {
        Ok(Vec::new())
    }
}

/// `parser.json_lines`: each non-empty stdout line is a JSON object matching
/// [`qa_core::RawDiagnostic`]'s shape; malformed lines fail the parse (the
/// caller records zero diagnostics for the whole invocation per spec §4.7
/// step 4 — a parser error is not partial-credit).
pub struct JsonLinesParser;

impl Parser for JsonLinesParser {
    fn parse(
        &self,
        stdout: &[String],
        _stderr: &[String],
        _ctx: &ToolContext,
    ) -> Result<Vec<qa_core::RawDiagnostic>, String> {
        stdout
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(|line| {
                serde_json::from_str::<qa_core::RawDiagnostic>(line)
                    .map_err(|err| format!("invalid diagnostic json line: {err}"))
            })
            .collect()
    }
}

/// `parser.regex_lines`: matches each stdout line against `config.pattern`,
/// a regex with named capture groups `file`, `line`, `column`, `code`,
/// `severity`, `message`. Lines that don't match are silently skipped (most
/// tools intersperse banner/summary lines with per-finding lines).
pub struct RegexLinesParser;

impl Parser for RegexLinesParser {
    fn parse(
        &self,
        _stdout: &[String],
        _stderr: &[String],
        _ctx: &ToolContext,
    ) -> Result<Vec<qa_core::RawDiagnostic>, String> {
        Err("parser.regex_lines requires config; use RegexLinesParser::with_pattern".to_string())
    }
}

impl RegexLinesParser {
    pub fn with_pattern(pattern: &str) -> Result<CompiledRegexParser, String> {
        let regex = Regex::new(pattern).map_err(|err| format!("invalid regex pattern: {err}"))?;
        Ok(CompiledRegexParser { regex })
    }
}

pub struct CompiledRegexParser {
    regex: Regex,
}

impl Parser for CompiledRegexParser {
    fn parse(
        &self,
        stdout: &[String],
        _stderr: &[String],
        _ctx: &ToolContext,
    ) -> Result<Vec<qa_core::RawDiagnostic>, String> {
        let mut out = Vec::new();
        for line in stdout {
            let Some(caps) = self.regex.captures(line) else {
                continue;
            };
            let get = |name: &str| caps.name(name).map(|m| m.as_str().to_string());
            out.push(qa_core::RawDiagnostic {
                file: get("file"),
                line: get("line").and_then(|s| s.parse().ok()),
                column: get("column").and_then(|s| s.parse().ok()),
                severity: get("severity"),
                message: get("message").unwrap_or_else(|| line.clone()),
                tool: None,
                code: get("code"),
                group: None,
                function: None,
                hints: Vec::new(),
                tags: Vec::new(),
                meta: serde_json::Value::Null,
            });
        }
        Ok(out)
    }
}

/// Resolves a catalog `strategy` id to its bound [`CommandBuilder`] or
/// [`Parser`] implementation at run time. Built once per orchestrator run
/// from a [`RunConfig`](qa_core::RunConfig) snapshot, since `subprocess.shell_template`
/// needs `jobs`/`line_length` baked in.
pub struct StrategyRegistry {
    commands: BTreeMap<String, Box<dyn CommandBuilder>>,
    parsers: BTreeMap<String, Box<dyn Parser>>,
}

impl StrategyRegistry {
    pub fn new(jobs: usize, line_length: u32) -> Self {
        let mut commands: BTreeMap<String, Box<dyn CommandBuilder>> = BTreeMap::new();
        commands.insert(
            "subprocess.argv".to_string(),
            Box::new(ArgvCommandBuilder { append_files: true }),
        );
        commands.insert(
            "subprocess.shell_template".to_string(),
            Box::new(ShellTemplateCommandBuilder {
                append_files: true,
                jobs,
                line_length,
            }),
        );

        let mut parsers: BTreeMap<String, Box<dyn Parser>> = BTreeMap::new();
        parsers.insert("parser.passthrough".to_string(), Box::new(PassthroughParser));
        parsers.insert("parser.json_lines".to_string(), Box::new(JsonLinesParser));
        parsers.insert("parser.regex_lines".to_string(), Box::new(RegexLinesParser));

        Self { commands, parsers }
    }

    pub fn command(&self, id: &str) -> Option<&dyn CommandBuilder> {
        self.commands.get(id).map(|b| b.as_ref())
    }

    pub fn parser(&self, id: &str) -> Option<&dyn Parser> {
        self.parsers.get(id).map(|p| p.as_ref())
    }
}

/// A resolved parser, either borrowed from the registry's shared builtins or
/// freshly compiled for one action (spec §4.7 step 4).
///
/// `parser.regex_lines` carries a per-action pattern in its config, so it
/// cannot live in the registry's shared slot the way `parser.passthrough`
/// and `parser.json_lines` do — two concurrently running actions with
/// different patterns would race on a single mutable entry. Compiling one
/// owned instance per action sidesteps that instead of serializing it
/// behind a lock.
pub enum ResolvedParser<'a> {
    Shared(&'a dyn Parser),
    Owned(Box<dyn Parser>),
}

impl<'a> Parser for ResolvedParser<'a> {
    fn parse(
        &self,
        stdout: &[String],
        stderr: &[String],
        ctx: &ToolContext,
    ) -> Result<Vec<qa_core::RawDiagnostic>, String> {
        match self {
            ResolvedParser::Shared(p) => p.parse(stdout, stderr, ctx),
            ResolvedParser::Owned(p) => p.parse(stdout, stderr, ctx),
        }
    }
}

/// Resolve an action's `parser` strategy reference (spec §4.1 "strategy
/// binding"). A missing reference defaults to `parser.passthrough`, matching
/// tools that report purely through their exit code.
pub fn resolve_parser<'a>(
    registry: &'a StrategyRegistry,
    parser_ref: Option<&qa_core::StrategyRef>,
) -> Result<ResolvedParser<'a>, String> {
    let Some(parser_ref) = parser_ref else {
        return Ok(ResolvedParser::Shared(
            registry.parser("parser.passthrough").expect("builtin parser.passthrough always registered"),
        ));
    };

    if parser_ref.strategy == "parser.regex_lines" {
        let pattern = parser_ref
            .config
            .get("pattern")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "parser.regex_lines strategy requires a config.pattern string".to_string())?;
        let compiled = RegexLinesParser::with_pattern(pattern)?;
        return Ok(ResolvedParser::Owned(Box::new(compiled)));
    }

    registry
        .parser(&parser_ref.strategy)
        .map(ResolvedParser::Shared)
        .ok_or_else(|| format!("unbound parser strategy '{}'", parser_ref.strategy))
}
