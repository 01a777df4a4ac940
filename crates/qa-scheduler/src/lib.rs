//! Worker-pool scheduling for orchestrated tool actions (spec §5).
//!
//! Deliberately free of `qa-core`'s catalog types beyond [`qa_core::ToolOutcome`]
//! — `qa-orchestrator` supplies the closures that actually call into
//! `qa-executor`, keeping this crate a generic "run these jobs, preserve
//! order, honor bail" primitive.

pub mod pool;

pub use pool::{run_scheduled, Job};
