//! Error types for partsmap.

use thiserror::Error;

use crate::parts::OperationType;

/// The main error type for building, compiling and executing statements.
#[derive(Debug, Error)]
pub enum PartsError {
    /// A required argument was missing or empty.
    #[error("Missing argument '{argument}': {context}")]
    MissingArgument {
        argument: &'static str,
        context: String,
    },

    /// The dialect cannot express the requested operation.
    #[error("{dialect} does not support {operation}")]
    Unsupported {
        dialect: &'static str,
        operation: String,
    },

    /// A list group was tagged with an operation that has no prologue.
    #[error("OperationType {0:?} is not implemented for field list groups")]
    UnknownGroup(OperationType),

    /// The statement shape is deliberately not implemented.
    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    /// Key inference found no primary key member.
    #[error("Entity '{entity}' has no primary key (expected 'Id' or '{entity}Id')")]
    NoPrimaryKey { entity: String },

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed TOML.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PartsError {
    /// Create a missing argument error.
    pub fn missing(argument: &'static str, context: impl Into<String>) -> Self {
        Self::MissingArgument {
            argument,
            context: context.into(),
        }
    }

    /// Create a capability error for a dialect.
    pub fn unsupported(dialect: &'static str, operation: impl Into<String>) -> Self {
        Self::Unsupported {
            dialect,
            operation: operation.into(),
        }
    }
}

/// Result type alias for partsmap operations.
pub type PartsResult<T> = Result<T, PartsError>;
