//! Shared data model and error taxonomy for the orchestration engine.
//!
//! Every other crate in this workspace depends on `qa-core` for the catalog
//! types ([`types`]), the run-time execution model ([`execution`]), the
//! diagnostic payloads ([`diagnostics`]), severity ranking ([`severity`]),
//! and the fatal error enum ([`error`]).

pub mod diagnostics;
pub mod error;
pub mod execution;
pub mod severity;
pub mod types;

pub use diagnostics::{Diagnostic, RawDiagnostic};
pub use error::{AppError, AppResult};
pub use execution::{
    ActionInvocation, CommandSource, DedupeConfig, DedupeStrategy, ExitCategory,
    FileDiscoveryConfig, FileMetrics, FileState, PreparedCommand, RunConfig, RunResult,
    ToolContext, ToolOutcome,
};
pub use severity::Severity;
pub use types::{
    CatalogFragment, CatalogSnapshot, DiagnosticsBundle, DocumentationBundle, ExitCodeSets, Phase,
    RuntimeKind, RuntimeSpec, StrategyConfigField, StrategyDefinition, StrategyKind, StrategyRef,
    Tool, ToolAction, PHASE_ORDER,
};
