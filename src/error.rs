// In: src/error.rs

//! This module defines the single, unified error type for the entire tambak-stream library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.
//!
//! Errors are never recovered from inside a pipeline: the first failure in any
//! stage aborts the current call and is handed to the immediate caller as-is.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    // =========================================================================
    // === Codec Errors
    // =========================================================================
    /// The input cannot be a valid encoding for the codec (bad alphabet byte,
    /// misplaced padding, truncated final group).
    #[error("Malformed {codec} input: {reason}")]
    MalformedInput { codec: &'static str, reason: String },

    /// A wrapped compression engine finished its session with a non-OK status.
    /// This is the only place a foreign status code is translated.
    #[error("Failed to {engine} with: {description} (status {status})")]
    Engine {
        engine: &'static str,
        status: i32,
        description: String,
    },

    /// The engine dropped its completion signal without ever reporting a status.
    #[error("Compression engine '{0}' dropped its session without reporting completion")]
    EngineDisconnected(&'static str),

    // =========================================================================
    // === Configuration Errors
    // =========================================================================
    #[error("Invalid pipeline configuration: {0}")]
    Config(String),

    #[error("Internal logic error (this is a bug): {0}")]
    InternalError(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An upstream read or downstream write failed. Propagated unchanged.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An error from the Serde JSON library, typically while loading a pipeline config.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

// =============================================================================
// === Manual `From` Implementations ===
// =============================================================================

impl From<base64::DecodeError> for TransformError {
    fn from(err: base64::DecodeError) -> Self {
        TransformError::MalformedInput {
            codec: "base64",
            reason: err.to_string(),
        }
    }
}

/// Lets pipeline stages sit behind `std::io::Read`. Upstream/downstream I/O
/// errors come back out unchanged; everything else is reported as invalid data.
impl From<TransformError> for io::Error {
    fn from(err: TransformError) -> io::Error {
        match err {
            TransformError::Io(inner) => inner,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
