//! Diagnostic normalization pipeline: severity rules, normalization,
//! suppression, tagging, and cross-tool dedup (spec §4.8).

pub mod dedupe;
pub mod normalize;
pub mod severity_rules;
pub mod suppress;
pub mod tags;

pub use dedupe::dedupe_outcomes;
pub use normalize::normalize;
pub use severity_rules::{apply_severity_rules, SeverityRule};
pub use suppress::filter_suppressed;
pub use tags::{issue_tag, AnnotationProvider, IssueTag, NullAnnotationProvider};
