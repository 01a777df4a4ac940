//! Command preparation (C7) and action execution (C8) — spec §4.6, §4.7.
//!
//! `qa-orchestrator` drives a tool's actions through [`preparer::prepare_command`]
//! then [`executor::execute`] for each one not served from cache.

pub mod exit;
pub mod executor;
pub mod failure_log;
pub mod preparer;
pub mod strategy;

pub use executor::{execute, from_cache, ExecutionOptions};
pub use exit::classify;
pub use failure_log::FailureRecord;
pub use preparer::{prepare_command, InstalledSet};
pub use strategy::{resolve_parser, Parser, ResolvedParser, StrategyRegistry};
