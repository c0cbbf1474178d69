//! Latest-value delivery of slot snapshots.

use std::sync::Arc;

use tokio::sync::watch;

use crate::engine::types::SlotAssignmentSnapshot;
use crate::error::ServiceError;

/// Producer side. Held by the reconciliation loop.
#[derive(Debug)]
pub struct SnapshotPublisher {
    sender: watch::Sender<Arc<SlotAssignmentSnapshot>>,
}

impl SnapshotPublisher {
    /// Creates a publisher whose current value is `initial`.
    #[must_use]
    pub fn new(initial: SlotAssignmentSnapshot) -> Self {
        let (sender, _) = watch::channel(Arc::new(initial));
        Self { sender }
    }

    /// Replaces the published snapshot. Readers see either the old or the new
    /// value, never a mix.
    pub fn publish(&self, snapshot: Arc<SlotAssignmentSnapshot>) { self.sender.send_replace(snapshot); }

    /// The currently published snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<SlotAssignmentSnapshot> { Arc::clone(&self.sender.borrow()) }

    /// Creates a new consumer. It starts out having seen the current value.
    #[must_use]
    pub fn subscribe(&self) -> SnapshotReceiver {
        SnapshotReceiver { receiver: self.sender.subscribe() }
    }
}

/// Consumer side. Cheap to clone; each clone tracks what it has seen.
#[derive(Debug, Clone)]
pub struct SnapshotReceiver {
    receiver: watch::Receiver<Arc<SlotAssignmentSnapshot>>,
}

impl SnapshotReceiver {
    /// The most recently published snapshot.
    #[must_use]
    pub fn latest(&self) -> Arc<SlotAssignmentSnapshot> { Arc::clone(&self.receiver.borrow()) }

    /// Waits for a snapshot newer than the last one this receiver saw.
    ///
    /// Intermediate snapshots published while the consumer was busy are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Stopped`] once the publisher is gone.
    pub async fn changed(&mut self) -> Result<Arc<SlotAssignmentSnapshot>, ServiceError> {
        self.receiver.changed().await.map_err(|_| ServiceError::Stopped)?;
        Ok(Arc::clone(&self.receiver.borrow_and_update()))
    }

    /// Returns `true` if a snapshot was published since the last one seen.
    #[must_use]
    pub fn has_changed(&self) -> bool { self.receiver.has_changed().unwrap_or(false) }
}
