//! Error types for schema registration, selection, and document assembly.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::ResourceIdentifier;

/// Errors raised while building or querying the schema registry.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unknown resource type '{type_name}'")]
    UnknownType { type_name: String },

    #[error("relationship '{type_name}.{relationship}' targets unknown type '{target}'")]
    UnknownTargetType {
        type_name: String,
        relationship: String,
        target: String,
    },

    #[error("invalid definition for '{type_name}': {message}")]
    InvalidDefinition { type_name: String, message: String },
}

/// Errors in a caller-supplied selection.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("fields selection names unknown type '{type_name}'")]
    UnknownType { type_name: String },

    #[error("unknown field '{field}' on type '{type_name}'")]
    UnknownField { type_name: String, field: String },

    #[error("invalid include path \"{path}\": {reason}")]
    InvalidIncludePath { path: String, reason: String },
}

/// Errors in the document being resolved.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("duplicate resource {identifier} with differing content")]
    DuplicateResource { identifier: ResourceIdentifier },

    #[error("dangling reference {identifier} in relationship '{relationship}' of {resource}")]
    DanglingReference {
        resource: ResourceIdentifier,
        relationship: String,
        identifier: ResourceIdentifier,
    },

    #[error("relationship '{relationship}' of {resource}: expected {expected} linkage, got {actual}")]
    CardinalityMismatch {
        resource: ResourceIdentifier,
        relationship: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("relationship '{relationship}' of {resource}: expected type '{expected}', got {identifier}")]
    TargetTypeMismatch {
        resource: ResourceIdentifier,
        relationship: String,
        expected: String,
        identifier: ResourceIdentifier,
    },

    #[error("malformed document with {} violation(s)", violations.len())]
    MalformedDocument { violations: Vec<Violation> },
}

/// Single structural violation with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Violation {
    /// JSON Pointer (RFC 6901) to the offending member.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Errors while loading schema or document input.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

/// Any error surfaced by a full resolution.
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Data(#[from] DataError),
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            LoadError::InvalidJson { .. } => 2,
        }
    }
}

impl ShapeError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ShapeError::Load(e) => e.exit_code(),
            ShapeError::Schema(_) | ShapeError::Selection(_) => 2,
            ShapeError::Data(_) => 1,
        }
    }
}
