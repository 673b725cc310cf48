// src/error.rs
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid syntax in record line: {0:?}")]
    RecordLineSyntax(String),

    #[error("invalid syntax in signal line: {0:?}")]
    SignalLineSyntax(String),

    #[error("invalid syntax in segment line: {0:?}")]
    SegmentLineSyntax(String),

    #[error("invalid {kind} value for {field}: {value:?}")]
    InvalidValue {
        field: &'static str,
        kind: &'static str,
        value: String,
    },

    #[error("{field} should default to {depends_on}, which is missing")]
    MissingDependency {
        field: &'static str,
        depends_on: &'static str,
    },

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("unknown {family} field: {name}")]
    UnknownField { family: &'static str, name: String },

    #[error("unknown signal format: {0}")]
    UnknownFormat(String),

    #[error("the length of field {field} must match field {expected_from} ({expected})")]
    LengthMismatch {
        field: &'static str,
        expected_from: &'static str,
        expected: usize,
    },

    #[error("each channel sharing dat file {file_name} must have the same fmt")]
    AmbiguousFormat { file_name: String },

    #[error("each channel sharing dat file {file_name} must have the same byte offset")]
    AmbiguousByteOffset { file_name: String },

    #[error("sum of seg_len fields ({sum}) does not match sig_len ({sig_len})")]
    SegmentLengthSum { sum: u64, sig_len: u64 },

    #[error("expected {expected} {line_kind} lines, found {found}")]
    LineCount {
        line_kind: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("signal name is not unique: {0}")]
    DuplicateSignalName(String),
}

impl HeaderError {
    /// Whether this error belongs to the grammar/syntax class (a line or a
    /// default that could not be resolved), as opposed to a cohesion or
    /// contract violation.
    pub fn is_syntax(&self) -> bool {
        matches!(
            self,
            HeaderError::RecordLineSyntax(_)
                | HeaderError::SignalLineSyntax(_)
                | HeaderError::SegmentLineSyntax(_)
                | HeaderError::InvalidValue { .. }
                | HeaderError::MissingDependency { .. }
                | HeaderError::LineCount { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, HeaderError>;
