//! Orchestrator (C10): drives discovery, tool selection, command
//! preparation, caching, and action execution into one `RunResult`
//! (spec §4.9), grounded in `pyqa/execution/orchestrator.py::Orchestrator`.

pub mod environment;
pub mod hooks;
pub mod metrics;
pub mod run;
pub mod versions;

pub use environment::prime_environment;
pub use hooks::OrchestratorHooks;
pub use metrics::build_file_metrics;
pub use run::{run, run_with_annotations};
pub use versions::{load_versions, save_versions};
