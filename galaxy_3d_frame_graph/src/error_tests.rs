//! Unit tests for error.rs
//!
//! Tests Error variants, Display output and the logging error macros.

use std::sync::Arc;
use crate::error::{Error, Result};
use crate::log::{Logger, LogSeverity, MemoryLogger};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("fence signal failed".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("fence signal failed"));
}

#[test]
fn test_out_of_memory_display() {
    assert_eq!(format!("{}", Error::OutOfMemory), "Out of GPU memory");
}

#[test]
fn test_invalid_resource_display() {
    let err = Error::InvalidResource("heap too small".to_string());
    assert_eq!(format!("{}", err), "Invalid resource: heap too small");
}

#[test]
fn test_initialization_failed_display() {
    let err = Error::InitializationFailed("no fence".to_string());
    assert_eq!(format!("{}", err), "Initialization failed: no fence");
}

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

// ============================================================================
// MACRO TESTS
// ============================================================================

#[test]
fn test_engine_err_logs_and_builds_backend_error() {
    let memory = Arc::new(MemoryLogger::new());
    let logger: Arc<dyn Logger> = memory.clone();

    let err = crate::engine_err!(logger, "galaxy3d::Test", "device lost after {} frames", 3);

    match err {
        Error::BackendError(msg) => assert_eq!(msg, "device lost after 3 frames"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(memory.count(LogSeverity::Error), 1);
    assert!(memory.entries()[0].line.is_some());
}

#[test]
fn test_engine_bail_returns_early() {
    fn fails(logger: Arc<dyn Logger>) -> Result<u32> {
        crate::engine_bail!(logger, "galaxy3d::Test", "bail out");
    }

    let memory = Arc::new(MemoryLogger::new());
    let result = fails(memory.clone());
    assert!(result.is_err());
    assert!(memory.contains("bail out"));
}

#[test]
fn test_error_propagation_with_question_mark() {
    fn inner() -> Result<i32> {
        Err(Error::OutOfMemory)
    }

    fn outer() -> Result<i32> {
        inner()?;
        Ok(42)
    }

    assert!(outer().is_err());
}
