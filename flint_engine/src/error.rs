//! Error types for the Flint engine
//!
//! This module defines the error types used throughout the engine. Swapchain
//! out-of-date and suboptimal states are deliberately absent: they are expected
//! conditions and travel as `AcquireOutcome` / `PresentOutcome` values instead.

use std::fmt;

/// Result type for Flint engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Flint engine errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Backend-specific error (Vulkan, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (image, framebuffer, swapchain, etc.)
    InvalidResource(String),

    /// Initialization failed (device, display, subsystems)
    InitializationFailed(String),

    /// A precondition on an argument was violated (zero extent, zero buffer count, ...)
    InvalidArgument(String),

    /// Attachment, frame or image index outside of its valid range
    IndexOutOfRange {
        index: usize,
        len: usize,
    },

    /// Operation called in the wrong state (present before submit, late node registration, ...)
    InvalidOperation(String),

    /// The GPU device was lost
    DeviceLost,

    /// A host wait on a synchronization primitive expired
    Timeout(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::IndexOutOfRange { index, len } => {
                write!(f, "Index {} out of range (len {})", index, len)
            }
            Error::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            Error::DeviceLost => write!(f, "GPU device lost"),
            Error::Timeout(msg) => write!(f, "Timeout: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Log this error at ERROR severity under `source`, then hand it back
    ///
    /// The caller's file and line are attached to the log entry.
    #[track_caller]
    pub fn logged(self, source: &str) -> Self {
        let location = std::panic::Location::caller();
        crate::engine::Engine::log_detailed(
            crate::log::LogSeverity::Error,
            source,
            self.to_string(),
            location.file(),
            location.line(),
        );
        self
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
