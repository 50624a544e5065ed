//! Typed errors for the composition pipeline.
//!
//! Only `ConflictError` (wrapped in `MergeFailure`) and `PersistenceError` are
//! fatal. The rest are collected and logged while the pipeline keeps going.

use std::path::PathBuf;
use thiserror::Error;

/// Id collision detected while merging contributions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
    #[error("Page '{page_id}' is redefined by contrib '{contrib_id}'. Use pagePatches instead.")]
    PageRedefined { page_id: String, contrib_id: String },

    #[error("Field ID '{field_id}' is already defined (contrib '{contrib_id}').")]
    DuplicateField { field_id: String, contrib_id: String },
}

/// A failed merge together with the diagnostics collected before the abort.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}")]
pub struct MergeFailure {
    #[source]
    pub error: ConflictError,
    pub diagnostics: Vec<String>,
}

/// One contribution file that could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read contribution file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse contribution file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("contribution file {path} does not contain a JSON object")]
    NotAnObject { path: PathBuf },
}

impl LoadError {
    pub fn path(&self) -> &PathBuf {
        match self {
            LoadError::Read { path, .. }
            | LoadError::Parse { path, .. }
            | LoadError::NotAnObject { path } => path,
        }
    }
}

/// A JSON value that cannot be represented as a template value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("number {0} is not representable as a 64-bit integer or finite float")]
    NonFiniteNumber(String),

    #[error("value nesting exceeds {0} levels")]
    TooDeep(usize),
}

/// Non-fatal problem found while projecting values onto the output template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionWarning {
    #[error("field '{0}' not found or has no JSON path")]
    UnknownField(String),

    #[error("field '{field_id}' has invalid JSON path '{path}': {reason}")]
    InvalidPath {
        field_id: String,
        path: String,
        reason: String,
    },

    #[error("value for field '{field_id}' could not be converted: {source}")]
    Conversion {
        field_id: String,
        #[source]
        source: ConversionError,
    },

    #[error("output template is not a usable JSON object; starting from an empty document")]
    SkeletonNotObject,
}

/// Failure to persist wizard state or the generated output document.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize document for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
