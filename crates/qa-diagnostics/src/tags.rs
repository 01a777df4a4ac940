//! Message-signature tokenization and issue-tag derivation (spec §4.8).

use std::collections::BTreeSet;

use qa_core::Diagnostic;

/// Semantic category assigned to a diagnostic during dedup, used to drive
/// tag-specific overlap rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueTag {
    Complexity,
    MagicNumber,
    Typing,
    Docstring,
    Encapsulation,
}

const COMPLEXITY_CODES: &[&str] = &["C901", "R0915", "PLR0915", "R1260"];
const MAGIC_NUMBER_CODES: &[&str] = &["PLR2004", "R2004"];
const DOCSTRING_CODE_PREFIX: &str = "D1";
const ANNOTATION_PREFIX: &str = "ANN";

/// Derives message-signature tokens used both for issue tagging and for
/// deciding whether two diagnostics describe the same symbol.
///
/// Implementers may plug in a richer, tool-aware provider (AST-derived
/// symbol names, for instance); this trait keeps that pluggable rather than
/// hardcoding the tokenizer into the dedup pass.
pub trait AnnotationProvider: Send + Sync {
    fn message_signature(&self, message: &str) -> BTreeSet<String>;
}

/// Lowercases and splits on non-alphanumeric boundaries. The default when no
/// richer provider is registered.
pub struct NullAnnotationProvider;

impl AnnotationProvider for NullAnnotationProvider {
    fn message_signature(&self, message: &str) -> BTreeSet<String> {
        message
            .to_ascii_lowercase()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect()
    }
}

pub fn issue_tag(diag: &Diagnostic, engine: &dyn AnnotationProvider) -> Option<IssueTag> {
    let code = diag.code.clone().unwrap_or_default().to_ascii_uppercase();
    let signature = engine.message_signature(&diag.message);

    let has_any = |tokens: &[&str]| tokens.iter().any(|t| signature.contains(*t));

    if COMPLEXITY_CODES.contains(&code.as_str()) || has_any(&["complex", "complexity"]) {
        return Some(IssueTag::Complexity);
    }
    if MAGIC_NUMBER_CODES.contains(&code.as_str()) || has_any(&["magic"]) {
        return Some(IssueTag::MagicNumber);
    }
    if code.starts_with(ANNOTATION_PREFIX) || has_any(&["annotation", "typed"]) {
        return Some(IssueTag::Typing);
    }
    if code.starts_with(DOCSTRING_CODE_PREFIX) || has_any(&["docstring"]) {
        return Some(IssueTag::Docstring);
    }
    if signature.contains("private") && signature.contains("import") {
        return Some(IssueTag::Encapsulation);
    }
    None
}
