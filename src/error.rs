//! Error taxonomy for the CDES engine.
//!
//! Two families, with different lifecycles:
//!
//! * [`LoadError`] — raised while building the engine at startup. Always
//!   fatal: the process refuses to serve from a partially loaded dataset.
//! * [`QueryError`] — raised by a single operation after startup. Never
//!   fatal; the query facade converts it into a structured
//!   `{error_kind, message}` result at the boundary.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal dataset-loading failure. The loader stops at the first one.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A document parsed but does not have the shape the loader needs,
    /// e.g. a schema without a top-level object or an entity without `id`.
    #[error("{path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("duplicate schema name '{name}' in {path}")]
    DuplicateSchema { name: String, path: PathBuf },

    #[error("duplicate {category} id '{id}' in {path}")]
    DuplicateEntity {
        category: String,
        id: String,
        path: PathBuf,
    },

    #[error("schema '{schema}' references unknown schema '{reference}'")]
    UnresolvedRef { schema: String, reference: String },

    #[error("schema reference cycle through '{schema}'")]
    ReferenceCycle { schema: String },

    #[error("no schema files found under {path}")]
    EmptySchemaDir { path: PathBuf },
}

/// Recoverable per-call failure surfaced to the caller of an operation.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The named schema, entity, or operation does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The call itself was malformed: wrong parameter type, empty name,
    /// non-object payload where an object is required.
    #[error("{0}")]
    InvalidInput(String),
}

impl QueryError {
    pub fn not_found(message: impl Into<String>) -> Self {
        QueryError::NotFound(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        QueryError::InvalidInput(message.into())
    }

    /// Stable machine-readable tag used in the error envelope and for
    /// HTTP status mapping.
    pub fn error_kind(&self) -> &'static str {
        match self {
            QueryError::NotFound(_) => "not_found",
            QueryError::InvalidInput(_) => "invalid_input",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_messages_name_the_file() {
        let err = LoadError::DuplicateSchema {
            name: "strain".into(),
            path: PathBuf::from("/data/schemas/strain.json"),
        };
        let text = err.to_string();
        assert!(text.contains("strain"));
        assert!(text.contains("/data/schemas/strain.json"));
    }

    #[test]
    fn query_error_kinds_are_stable() {
        assert_eq!(QueryError::not_found("x").error_kind(), "not_found");
        assert_eq!(
            QueryError::invalid_input("y").error_kind(),
            "invalid_input"
        );
    }
}
