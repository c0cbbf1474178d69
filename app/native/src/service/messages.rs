//! Message types for the reconciliation service.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::engine::rules::CaptureFilter;
use crate::engine::types::{SlotRegistry, WindowHandle};
use crate::error::ReconcileError;

/// Commands sent to the service task. Processed strictly between cycles.
#[derive(Debug)]
pub enum ServiceMessage {
    /// Stop the periodic trigger.
    Pause,
    /// Restart the periodic trigger; a cycle runs right away.
    Resume,
    /// Run a forced full pass now (or on resume, if paused).
    RefreshNow,
    /// Swap in a new slot registry and force a full pass.
    ReplaceRegistry(SlotRegistry),
    /// Swap in a new capture filter.
    SetCaptureFilter(CaptureFilter),
    /// Caller-supplied windows to leave out of capture.
    SetExcludedHandles(HashSet<WindowHandle>),
    /// The application's own windows.
    SetSelfHandles(HashSet<WindowHandle>),
    /// Change the cycle interval.
    SetInterval(Duration),
    /// Change the side-table eviction threshold.
    SetEvictionThreshold(usize),
    /// Report service state.
    Status { respond_to: oneshot::Sender<ServiceStatus> },
    /// Stop the service task.
    Shutdown,
}

impl ServiceMessage {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Pause => "Pause",
            Self::Resume => "Resume",
            Self::RefreshNow => "RefreshNow",
            Self::ReplaceRegistry(_) => "ReplaceRegistry",
            Self::SetCaptureFilter(_) => "SetCaptureFilter",
            Self::SetExcludedHandles(_) => "SetExcludedHandles",
            Self::SetSelfHandles(_) => "SetSelfHandles",
            Self::SetInterval(_) => "SetInterval",
            Self::SetEvictionThreshold(_) => "SetEvictionThreshold",
            Self::Status { .. } => "Status",
            Self::Shutdown => "Shutdown",
        }
    }
}

/// Result of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A new snapshot was published.
    Published { slots: usize },
    /// Nothing changed; nothing was published.
    Unchanged,
    /// The engine produced an inconsistent snapshot; the previous one stays.
    Rejected(ReconcileError),
    /// The cycle panicked and was abandoned.
    Panicked(String),
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Published { slots } => write!(f, "published {slots} slots"),
            Self::Unchanged => f.write_str("unchanged"),
            Self::Rejected(err) => write!(f, "rejected: {err}"),
            Self::Panicked(msg) => write!(f, "panicked: {msg}"),
        }
    }
}

/// Point-in-time service state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub paused: bool,
    pub interval: Duration,
    pub cycles: u64,
    pub published: u64,
    pub registry_revision: u64,
    pub live_windows: usize,
    pub claims: usize,
    pub last_outcome: Option<CycleOutcome>,
}
