use std::path::PathBuf;

/// Error taxonomy for the orchestration engine (see spec §7).
///
/// Only [`AppError::CatalogValidationError`] and [`AppError::CatalogIntegrityError`]
/// are meant to propagate out of the public API via `?` — they are fatal to
/// catalog load. The remaining variants describe failures that the
/// orchestrator captures and turns into a recorded outcome instead of an
/// exception: [`AppError::PreparationError`] becomes a failed action record,
/// [`AppError::MissingExecutable`] becomes a tool-failure outcome, and so on.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("catalog validation failed for '{file}': {message}")]
    CatalogValidationError { file: PathBuf, message: String },

    #[error("catalog integrity violation: {0}")]
    CatalogIntegrityError(String),

    #[error("cannot prepare '{tool}::{action}': {message}")]
    PreparationError {
        tool: String,
        action: String,
        message: String,
    },

    #[error("executable '{0}' not found on PATH")]
    MissingExecutable(String),

    #[error("subprocess '{tool}::{action}' timed out after {timeout_secs}s")]
    SubprocessTimeout {
        tool: String,
        action: String,
        timeout_secs: u64,
    },

    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("parser for '{tool}::{action}' failed: {message}")]
    ParserError {
        tool: String,
        action: String,
        message: String,
    },
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_catalog_validation_error() {
        let err = AppError::CatalogValidationError {
            file: PathBuf::from("catalog/ruff.json"),
            message: "missing required field 'phase'".into(),
        };
        assert_eq!(
            err.to_string(),
            "catalog validation failed for 'catalog/ruff.json': missing required field 'phase'"
        );
    }

    #[test]
    fn test_display_catalog_integrity_error() {
        let err = AppError::CatalogIntegrityError("duplicate tool name 'ruff'".into());
        assert_eq!(
            err.to_string(),
            "catalog integrity violation: duplicate tool name 'ruff'"
        );
    }

    #[test]
    fn test_display_preparation_error() {
        let err = AppError::PreparationError {
            tool: "eslint".into(),
            action: "lint".into(),
            message: "missing required setting 'config_path'".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot prepare 'eslint::lint': missing required setting 'config_path'"
        );
    }

    #[test]
    fn test_display_missing_executable() {
        let err = AppError::MissingExecutable("golangci-lint".into());
        assert_eq!(
            err.to_string(),
            "executable 'golangci-lint' not found on PATH"
        );
    }

    #[test]
    fn test_display_subprocess_timeout() {
        let err = AppError::SubprocessTimeout {
            tool: "mypy".into(),
            action: "check".into(),
            timeout_secs: 30,
        };
        assert_eq!(
            err.to_string(),
            "subprocess 'mypy::check' timed out after 30s"
        );
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AppError>();
    }
}
