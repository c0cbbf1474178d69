//! Error types for Pieslot.
//!
//! `PieslotError` is the crate-level error surfaced to the CLI. The engine and
//! service have their own narrower enums that convert into it.

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::engine::types::WindowHandle;

/// Errors that can occur during application execution.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum PieslotError {
    /// Invalid command arguments.
    #[error("{0}")]
    InvalidArguments(String),
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// IO error.
    #[error("IO error: {0}")]
    IoError(String),
    /// A platform window operation failed or is unavailable.
    #[error("Platform error: {0}")]
    PlatformError(String),
    /// A program could not be started.
    #[error("Launch error: {0}")]
    LaunchError(String),
    /// A slot referenced a function that is not registered.
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    /// A reconciliation cycle was refused.
    #[error("Reconciliation error: {0}")]
    ReconcileError(String),
    /// The background service could not be reached.
    #[error("Service error: {0}")]
    ServiceError(String),
}

impl From<std::io::Error> for PieslotError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err.to_string()) }
}

impl From<serde_json::Error> for PieslotError {
    fn from(err: serde_json::Error) -> Self { Self::InvalidArguments(err.to_string()) }
}

impl From<ConfigError> for PieslotError {
    fn from(err: ConfigError) -> Self { Self::ConfigError(err.to_string()) }
}

impl From<ReconcileError> for PieslotError {
    fn from(err: ReconcileError) -> Self { Self::ReconcileError(err.to_string()) }
}

impl From<ServiceError> for PieslotError {
    fn from(err: ServiceError) -> Self { Self::ServiceError(err.to_string()) }
}

/// Internal consistency failures detected before a snapshot is published.
///
/// Any of these means the engine produced an inconsistent assignment; the
/// cycle is dropped and the previous snapshot stays published.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// One live handle ended up in two slots.
    #[error("window {handle} assigned to slots {first} and {second}")]
    DuplicateAssignment {
        handle: WindowHandle,
        first: usize,
        second: usize,
    },
    /// A slot was assigned a handle that is not in the live set.
    #[error("slot {slot} assigned window {handle} which is not live")]
    StaleAssignment { slot: usize, handle: WindowHandle },
    /// A pinned slot's executable changed.
    #[error("slot {slot} pinned executable changed from {expected:?} to {actual:?}")]
    PinnedExeChanged {
        slot: usize,
        expected: String,
        actual: String,
    },
    /// The snapshot does not cover exactly the registry's slots.
    #[error("snapshot has {actual} slots, registry has {expected}")]
    SlotCountMismatch { expected: usize, actual: usize },
}

/// Failures talking to the background service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The service task has exited.
    #[error("reconciliation service is not running")]
    Stopped,
    /// The command queue is full.
    #[error("reconciliation service is busy")]
    Busy,
    /// The service dropped a reply without answering.
    #[error("reconciliation service did not reply")]
    NoReply,
}
