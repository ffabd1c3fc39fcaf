//! # Core Error Types
//!
//! Errors raised while attaching a motion source or writing a frame.

use thiserror::Error;

/// Failure to load or bind a motion source.
///
/// Fatal to the Animator instance that raised it. No partial skeleton is
/// ever left behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    /// The source does not exist or could not be opened.
    #[error("motion source not found: {path}")]
    SourceMissing {
        /// Source identifier as given to `initialize`.
        path: String,
    },

    /// The source exists but its contents could not be decoded.
    #[error("malformed motion source {path}: {reason}")]
    Malformed {
        /// Source identifier as given to `initialize`.
        path: String,
        /// Decoder message.
        reason: String,
    },

    /// The skeleton topology violates a structural rule.
    #[error("invalid skeleton: {0}")]
    InvalidSkeleton(String),

    /// `initialize` was called a second time.
    #[error("animator already initialized")]
    AlreadyInitialized,
}

/// Errors from the Animator contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnimatorError {
    /// An operation ran before `initialize` succeeded.
    #[error("animator used before initialize")]
    NotInitialized,

    /// Caller-supplied buffer cannot hold one frame at the given offset.
    ///
    /// This is a programming error; nothing is written.
    #[error("frame buffer too small: need {required} bytes, have {available}")]
    BufferTooSmall {
        /// `offset + memory_size`.
        required: usize,
        /// Length of the supplied buffer.
        available: usize,
    },

    /// Initialization failed.
    #[error(transparent)]
    Init(#[from] InitError),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, AnimatorError>;
