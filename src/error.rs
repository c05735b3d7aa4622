//! Error taxonomy for the classification pipeline.
//!
//! Every failure maps onto an [`ErrorKind`], and every kind has a fixed
//! integer code so the C boundary can report it without unwinding.

use std::path::PathBuf;

/// Failure categories reported across the C boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ModelParseFailure,
    ReshapeFailure,
    CompileFailure,
    RequestCreationFailure,
    IndexOutOfRange,
    InvalidModel,
    InvalidArgument,
    EnumerationFailure,
    NotReady,
    InferenceFailure,
}

impl ErrorKind {
    /// Integer code returned by the exported functions.
    pub fn code(&self) -> i32 {
        match self {
            ErrorKind::ModelParseFailure => 1,
            ErrorKind::ReshapeFailure => 2,
            ErrorKind::CompileFailure => 3,
            ErrorKind::RequestCreationFailure => 4,
            ErrorKind::IndexOutOfRange => 5,
            ErrorKind::InvalidModel => 6,
            ErrorKind::InvalidArgument => 7,
            ErrorKind::EnumerationFailure => 8,
            ErrorKind::NotReady => -1,
            ErrorKind::InferenceFailure => -2,
        }
    }
}

/// Errors raised by an inference runtime implementation.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The underlying engine rejected an operation.
    #[error("{op} failed: {message}")]
    Backend { op: &'static str, message: String },

    /// The runtime cannot perform the requested operation for this model.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// A tensor had a shape the pipeline cannot work with.
    #[error("unexpected tensor shape {0:?}")]
    Shape(Vec<usize>),
}

impl RuntimeError {
    /// Wrap any displayable engine error with the name of the failing call.
    pub fn backend(op: &'static str, err: impl std::fmt::Display) -> Self {
        RuntimeError::Backend {
            op,
            message: err.to_string(),
        }
    }
}

/// Reasons a model load is aborted.
///
/// A rejected reshape is not an error: it degrades the load and is reported
/// through [`crate::engine::LoadStatus::Degraded`].
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read model '{}': {source}", path.display())]
    ModelParse {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },

    #[error("device index {index} out of range ({available} devices enumerated)")]
    DeviceIndex { index: usize, available: usize },

    #[error("failed to compile model for device '{device}': {source}")]
    Compile {
        device: String,
        #[source]
        source: RuntimeError,
    },

    #[error("failed to create inference request: {0}")]
    RequestCreation(#[source] RuntimeError),

    #[error("invalid model: {0}")]
    InvalidModel(String),
}

impl LoadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoadError::ModelParse { .. } => ErrorKind::ModelParseFailure,
            LoadError::DeviceIndex { .. } => ErrorKind::IndexOutOfRange,
            LoadError::Compile { .. } => ErrorKind::CompileFailure,
            LoadError::RequestCreation(_) => ErrorKind::RequestCreationFailure,
            LoadError::InvalidModel(_) => ErrorKind::InvalidModel,
        }
    }
}

/// Errors from device lookup and per-call inference.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("no model loaded")]
    NotReady,

    #[error("device index {index} out of range ({available} devices enumerated)")]
    IndexOutOfRange { index: usize, available: usize },

    #[error("pixel buffer has {actual} bytes, expected {expected}")]
    InputSize { expected: usize, actual: usize },

    #[error("device enumeration failed: {0}")]
    Enumeration(#[source] RuntimeError),

    #[error("inference failed: {0}")]
    Inference(#[from] RuntimeError),
}

impl ClassifierError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClassifierError::NotReady => ErrorKind::NotReady,
            ClassifierError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            ClassifierError::InputSize { .. } => ErrorKind::InferenceFailure,
            ClassifierError::Enumeration(_) => ErrorKind::EnumerationFailure,
            ClassifierError::Inference(_) => ErrorKind::InferenceFailure,
        }
    }
}
