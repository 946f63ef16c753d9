//! Error types for the protoprobe-core library.
//!
//! Two families live here. [`Error`] covers schema loading and is fatal to
//! the load that raised it. [`DecodeError`] covers a single decode call; the
//! boolean decode entry point collapses it to `false`, but it is kept intact
//! for diagnostics.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for schema operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading schema sources
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read a schema file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Malformed schema text
    #[error("{origin}:{line}: {details}")]
    SchemaSyntax {
        /// Name of the schema source (file path or `<inline>`)
        origin: String,
        /// 1-based line number
        line: usize,
        /// What was wrong with the line
        details: String,
    },

    /// The source has no `syntax = "...";` declaration
    #[error("{origin}: no syntax declaration found")]
    MissingSyntax {
        /// Name of the schema source
        origin: String,
    },

    /// Two fields of one message share a number
    #[error("message '{message}' declares field number {number} more than once")]
    DuplicateField {
        /// Message being declared
        message: String,
        /// The repeated field number
        number: u32,
    },

    /// An import chain leads back to a file that is still being loaded
    #[error("import cycle detected at '{path}'")]
    ImportCycle {
        /// The import path that closed the cycle
        path: String,
    },

    /// The source declares no message at all
    #[error("{origin}: schema declares no message")]
    EmptySchema {
        /// Name of the schema source
        origin: String,
    },
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new schema syntax error
    pub fn syntax(origin: impl Into<String>, line: usize, details: impl Into<String>) -> Self {
        Self::SchemaSyntax {
            origin: origin.into(),
            line,
            details: details.into(),
        }
    }

    /// Creates a new missing syntax error
    pub fn missing_syntax(origin: impl Into<String>) -> Self {
        Self::MissingSyntax {
            origin: origin.into(),
        }
    }

    /// Creates a new empty schema error
    pub fn empty_schema(origin: impl Into<String>) -> Self {
        Self::EmptySchema {
            origin: origin.into(),
        }
    }
}

/// Reasons a binary does not match a message definition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// The stream names a field the message does not declare
    #[error("field number {number} is not declared by message '{message}'")]
    UnknownField {
        /// Message being decoded
        message: String,
        /// Field number read from the key
        number: u64,
    },

    /// A field's declared type is neither primitive nor a registered message
    #[error("field '{field}' has unresolved type '{type_name}'")]
    UnknownType {
        /// Field name
        field: String,
        /// Declared type name
        type_name: String,
    },

    /// Key carries wire type 6 or 7
    #[error("invalid wire type {0}")]
    InvalidWireType(u8),

    /// Observed wire type differs from the one the declared type requires
    #[error("field '{field}' of type '{type_name}' cannot be read from wire type {wire_type}")]
    WireTypeMismatch {
        /// Field name
        field: String,
        /// Declared type name
        type_name: String,
        /// Wire type read from the key
        wire_type: u8,
    },

    /// The stream ended in the middle of a key or value
    #[error("stream ended while reading {context}")]
    TruncatedStream {
        /// What was being read
        context: &'static str,
    },

    /// A varint ran past ten bytes
    #[error("varint longer than 10 bytes")]
    VarintOverflow,

    /// A required or optional field ended with the wrong number of values
    #[error("field '{field}' is {cardinality} but holds {count} values")]
    CardinalityViolation {
        /// Field name
        field: String,
        /// Declared cardinality keyword
        cardinality: &'static str,
        /// Values decoded for it
        count: usize,
    },

    /// A read would have consumed more bytes than the frame allows
    #[error("read of {needed} bytes exceeds remaining frame budget of {remaining}")]
    BudgetExceeded {
        /// Bytes the read needed
        needed: usize,
        /// Bytes left in the frame
        remaining: usize,
    },

    /// Nested messages went deeper than the configured limit
    #[error("nesting deeper than {0} levels")]
    RecursionLimit(usize),
}

impl DecodeError {
    /// Creates a new truncated stream error
    pub fn truncated(context: &'static str) -> Self {
        Self::TruncatedStream { context }
    }

    /// Creates a new budget error
    pub fn budget(needed: usize, remaining: usize) -> Self {
        Self::BudgetExceeded { needed, remaining }
    }

    /// Returns true if the failure comes from the shape of the input bytes
    /// rather than from the schema disagreeing with well-formed data
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidWireType(_)
                | Self::TruncatedStream { .. }
                | Self::VarintOverflow
                | Self::BudgetExceeded { .. }
        )
    }
}
