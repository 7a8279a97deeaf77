//! Preflight error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors detected before any output is written.
#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("`{0}` is not a directory")]
    NotADirectory(PathBuf),

    #[error("`{0}` missing from `{1}`")]
    MissingDocument(&'static str, PathBuf),

    #[error("required template `{0}` missing from `{1}`")]
    MissingTemplate(String, PathBuf),

    #[error("converter `{0}` not found. Please install it first.")]
    ConverterNotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preflight_error_display() {
        let err = PreflightError::MissingDocument("index.org", PathBuf::from("site"));
        let display = format!("{err}");
        assert!(display.contains("index.org"));
        assert!(display.contains("site"));

        let err = PreflightError::MissingTemplate(
            "container.mustache".to_string(),
            PathBuf::from("site/templates"),
        );
        let display = format!("{err}");
        assert!(display.contains("container.mustache"));
    }
}
