//! Error types for the Galaxy3D frame graph
//!
//! Device-side failures (GPU object creation, fences, command submission)
//! travel as `Error` values. Malformed graphs are programming defects and
//! panic at the offending builder call instead.

use std::fmt;

/// Result type for frame graph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Frame graph errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error reported by the graphics device
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (texture, buffer, heap, descriptor, etc.)
    InvalidResource(String),

    /// Initialization failed (fences, allocator, device objects)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an error through the given logger and build an `Error::BackendError`
///
/// # Example
///
/// ```ignore
/// let device = self.device.lock()
///     .map_err(|_| engine_err!(self.logger, "galaxy3d::ResourceAllocator", "GraphicsDevice lock poisoned"))?;
/// ```
#[macro_export]
macro_rules! engine_err {
    ($logger:expr, $source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::log::emit_detailed(
            &$logger,
            $crate::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!(),
        );
        $crate::galaxy3d::Error::BackendError(message)
    }};
}

/// Log an error and return early with `Err(Error::BackendError(..))`
#[macro_export]
macro_rules! engine_bail {
    ($logger:expr, $source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($logger, $source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
