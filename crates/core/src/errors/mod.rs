use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// Error taxonomy shared by every stage of the generation pipeline
#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("{kind} not found: {name}")]
    NotFound { kind: String, name: String },

    #[error("Validation failed for {path}: {}", diagnostics.join("; "))]
    Validation {
        path: PathBuf,
        diagnostics: Vec<String>,
    },

    #[error("Extraction failed for {path}: {message}")]
    Extraction { path: PathBuf, message: String },

    #[error("Refusing to overwrite existing file(s): {}", display_paths(paths))]
    Conflict { paths: Vec<PathBuf> },

    #[error("Catalog error: {0}")]
    Catalog(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}", display_failures(failures))]
    WriteFailed { failures: Vec<(PathBuf, String)> },

    #[error("Template error: {message}")]
    Template { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Unsafe operation refused: {message}")]
    Unsafe { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn display_failures(failures: &[(PathBuf, String)]) -> String {
    failures
        .iter()
        .map(|(path, cause)| format!("{} ({})", path.display(), cause))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ForgeError {
    /// Create a not-found error for a table, module or file
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a validation failure carrying the parser diagnostics
    pub fn validation(path: impl Into<PathBuf>, diagnostics: Vec<String>) -> Self {
        Self::Validation {
            path: path.into(),
            diagnostics,
        }
    }

    /// Create an extraction error for a source file that cannot be read or parsed
    pub fn extraction(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Extraction {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Wrap a catalog driver error without altering it
    pub fn catalog<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Catalog(Box::new(error))
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    pub fn unsafe_operation(message: impl Into<String>) -> Self {
        Self::Unsafe {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => 2,
            Self::Validation { .. } => 3,
            Self::Conflict { .. } => 4,
            Self::Catalog(_) => 5,
            _ => 1,
        }
    }
}

pub type ForgeResult<T> = Result<T, ForgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_taxonomy() {
        assert_eq!(ForgeError::not_found("Table", "widgets").exit_code(), 2);
        assert_eq!(
            ForgeError::validation("a.rs", vec!["unexpected `}`".into()]).exit_code(),
            3
        );
        assert_eq!(
            ForgeError::Conflict {
                paths: vec![PathBuf::from("a.rs")]
            }
            .exit_code(),
            4
        );
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(ForgeError::catalog(io).exit_code(), 5);
        assert_eq!(ForgeError::template("bad").exit_code(), 1);
    }

    #[test]
    fn test_catalog_error_message_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let err = ForgeError::catalog(io);
        assert_eq!(err.to_string(), "Catalog error: connection refused");
    }

    #[test]
    fn test_conflict_lists_every_path() {
        let err = ForgeError::Conflict {
            paths: vec![PathBuf::from("a/mod.rs"), PathBuf::from("a/types.rs")],
        };
        assert!(err.to_string().contains("a/mod.rs, a/types.rs"));
        assert!(err.is_conflict());
    }

    #[test]
    fn test_write_failure_names_path_and_cause() {
        let err = ForgeError::WriteFailed {
            failures: vec![(
                PathBuf::from("src/modules/widgets/types.rs"),
                "Permission denied (os error 13)".into(),
            )],
        };
        assert_eq!(
            err.to_string(),
            "Failed to write src/modules/widgets/types.rs (Permission denied (os error 13))"
        );
        assert_eq!(err.exit_code(), 1);
    }
}
