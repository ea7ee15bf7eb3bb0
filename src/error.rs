//! Error types for metaseq.
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Result type alias using [`MqError`].
pub type Result<T> = std::result::Result<T, MqError>;

/// Errors that can occur while reading or converting a scene.
#[derive(Error, Debug)]
pub enum MqError {
    /// The document is malformed: a bad numeric literal, an unknown chunk
    /// or key, a wrong file signature, or an unsupported format version.
    ///
    /// The grammar is closed — unrecognized tokens abort the parse rather
    /// than being skipped.
    #[error("format error at line {line}: {message}")]
    Format {
        /// The 1-based line number where the error was detected.
        line: usize,
        /// Description of the problem, including the offending token.
        message: String,
    },

    /// The document contains the trial-build marker chunk written by
    /// restricted versions of the modeler. Such files cannot be converted.
    #[error("line {line}: file was saved by a trial version of the modeler and cannot be imported")]
    TrialRestriction {
        /// The 1-based line number of the marker chunk.
        line: usize,
    },

    /// An internal topological invariant was violated (for example, an
    /// edge expected on a face was not found during stitching). This
    /// indicates a bug in mesh construction, not bad input.
    #[error("mesh consistency violation: {0}")]
    Consistency(String),

    /// The source file could not be opened or read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MqError {
    /// Create a format error for the given line.
    pub fn format<S: Into<String>>(line: usize, message: S) -> Self {
        MqError::Format {
            line,
            message: message.into(),
        }
    }

    /// Create a format error for an unexpected token.
    pub fn unknown_token(line: usize, token: &str) -> Self {
        MqError::Format {
            line,
            message: format!("unknown token `{token}`"),
        }
    }
}
