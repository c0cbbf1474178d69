//! Handle for talking to the reconciliation service.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use super::messages::{ServiceMessage, ServiceStatus};
use crate::config::PieslotConfig;
use crate::engine::publisher::SnapshotReceiver;
use crate::engine::rules::CaptureFilter;
use crate::engine::types::{SlotAssignmentSnapshot, SlotRegistry, WindowHandle};
use crate::error::ServiceError;

/// Cloneable front end of a running [`ReconcileService`](super::ReconcileService).
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    sender: mpsc::Sender<ServiceMessage>,
    snapshots: SnapshotReceiver,
}

impl ServiceHandle {
    pub(crate) const fn new(sender: mpsc::Sender<ServiceMessage>, snapshots: SnapshotReceiver) -> Self {
        Self { sender, snapshots }
    }

    /// Queues a message without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Stopped`] if the service has exited, or
    /// [`ServiceError::Busy`] if its queue is full.
    pub fn send(&self, message: ServiceMessage) -> Result<(), ServiceError> {
        self.sender.try_send(message).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => ServiceError::Busy,
            mpsc::error::TrySendError::Closed(_) => ServiceError::Stopped,
        })
    }

    /// Returns `true` while the service task is running.
    #[must_use]
    pub fn is_alive(&self) -> bool { !self.sender.is_closed() }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Stops periodic cycles after the current one.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be queued.
    pub fn pause(&self) -> Result<(), ServiceError> { self.send(ServiceMessage::Pause) }

    /// Restarts periodic cycles.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be queued.
    pub fn resume(&self) -> Result<(), ServiceError> { self.send(ServiceMessage::Resume) }

    /// Requests a forced full pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be queued.
    pub fn refresh_now(&self) -> Result<(), ServiceError> { self.send(ServiceMessage::RefreshNow) }

    /// Replaces the slot registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be queued.
    pub fn replace_registry(&self, registry: SlotRegistry) -> Result<(), ServiceError> {
        self.send(ServiceMessage::ReplaceRegistry(registry))
    }

    /// Replaces the capture filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be queued.
    pub fn set_capture_filter(&self, filter: CaptureFilter) -> Result<(), ServiceError> {
        self.send(ServiceMessage::SetCaptureFilter(filter))
    }

    /// Sets caller-excluded windows (e.g. overlays).
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be queued.
    pub fn set_excluded_handles(&self, handles: HashSet<WindowHandle>) -> Result<(), ServiceError> {
        self.send(ServiceMessage::SetExcludedHandles(handles))
    }

    /// Sets the application's own windows.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be queued.
    pub fn set_self_handles(&self, handles: HashSet<WindowHandle>) -> Result<(), ServiceError> {
        self.send(ServiceMessage::SetSelfHandles(handles))
    }

    /// Changes the cycle interval.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be queued.
    pub fn set_interval(&self, interval: Duration) -> Result<(), ServiceError> {
        self.send(ServiceMessage::SetInterval(interval))
    }

    /// Applies a reloaded configuration: filter, thresholds, interval, then
    /// the slot registry last so the forced pass sees everything else.
    ///
    /// # Errors
    ///
    /// Returns an error if any message cannot be queued.
    pub fn apply_config(&self, config: &PieslotConfig) -> Result<(), ServiceError> {
        self.send(ServiceMessage::SetCaptureFilter(config.capture_filter()))?;
        self.send(ServiceMessage::SetEvictionThreshold(config.eviction_threshold))?;
        self.send(ServiceMessage::SetInterval(config.refresh_interval()))?;
        self.send(ServiceMessage::ReplaceRegistry(config.slot_registry()))
    }

    /// Asks the service to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be queued.
    pub fn shutdown(&self) -> Result<(), ServiceError> { self.send(ServiceMessage::Shutdown) }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Fetches the service state.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Stopped`] if the service has exited or
    /// [`ServiceError::NoReply`] if it dropped the request.
    pub async fn status(&self) -> Result<ServiceStatus, ServiceError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(ServiceMessage::Status { respond_to: tx })
            .await
            .map_err(|_| ServiceError::Stopped)?;

        rx.await.map_err(|_| ServiceError::NoReply)
    }

    /// Fetches the service state with a timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NoReply`] on timeout, or any error from
    /// [`Self::status`].
    pub async fn status_timeout(&self, timeout: Duration) -> Result<ServiceStatus, ServiceError> {
        tokio::time::timeout(timeout, self.status()).await.map_err(|_| ServiceError::NoReply)?
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// A new consumer of published snapshots.
    #[must_use]
    pub fn subscribe(&self) -> SnapshotReceiver { self.snapshots.clone() }

    /// The most recently published snapshot.
    #[must_use]
    pub fn latest(&self) -> Arc<SlotAssignmentSnapshot> { self.snapshots.latest() }
}
