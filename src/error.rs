//! Error types for parasort
//!
//! This module provides the error handling types used throughout the library.

use thiserror::Error;

/// Main error type for parasort operations
#[derive(Error, Debug)]
pub enum Error {
    /// Spawning a worker's OS thread failed
    #[error("Failed to spawn worker thread: {reason}")]
    Spawn {
        /// Reason for the spawn failure
        reason: String,
    },

    /// A submitted task panicked while executing
    #[error("Task panicked: {reason}")]
    TaskPanicked {
        /// Panic payload, rendered as a string
        reason: String,
    },

    /// A queued task was destroyed unexecuted at pool teardown
    #[error("Task was abandoned before execution")]
    TaskAbandoned,
}

/// Convenient result type alias
pub type Result<T> = std::result::Result<T, Error>;
