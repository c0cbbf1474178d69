//! The synchronous capture -> disambiguate -> reconcile -> publish pipeline.
//!
//! [`Reconciler`] owns all cross-cycle state. It is driven either by the
//! periodic service task or directly (one-shot CLI commands, tests).

use std::collections::HashSet;
use std::sync::Arc;

use crate::engine::capture::WindowSnapshotProvider;
use crate::engine::instances::assign_instances;
use crate::engine::publisher::{SnapshotPublisher, SnapshotReceiver};
use crate::engine::reconcile::ReconciliationEngine;
use crate::engine::rules::CaptureFilter;
use crate::engine::types::{LiveWindowSet, RawWindowSet, SlotAssignmentSnapshot, SlotRegistry, WindowHandle};
use crate::service::messages::CycleOutcome;

/// Single owner of one reconciliation pipeline.
pub struct Reconciler {
    provider: WindowSnapshotProvider,
    engine: ReconciliationEngine,
    registry: SlotRegistry,
    publisher: SnapshotPublisher,
    excluded_handles: HashSet<WindowHandle>,
    self_handles: HashSet<WindowHandle>,
    previous_raw: Option<RawWindowSet>,
    previous_live: LiveWindowSet,
    previous_cache_generation: u64,
    force_full_pass: bool,
}

impl Reconciler {
    /// Creates a pipeline. The initial published snapshot mirrors `registry`.
    #[must_use]
    pub fn new(provider: WindowSnapshotProvider, engine: ReconciliationEngine, registry: SlotRegistry) -> Self {
        let publisher = SnapshotPublisher::new(SlotAssignmentSnapshot::from_registry(&registry));
        Self {
            provider,
            engine,
            registry,
            publisher,
            excluded_handles: HashSet::new(),
            self_handles: HashSet::new(),
            previous_raw: None,
            previous_live: LiveWindowSet::new(),
            previous_cache_generation: 0,
            force_full_pass: true,
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> SnapshotReceiver { self.publisher.subscribe() }

    /// The currently published snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<SlotAssignmentSnapshot> { self.publisher.current() }

    #[must_use]
    pub const fn registry(&self) -> &SlotRegistry { &self.registry }

    /// Live windows as of the last accepted cycle.
    #[must_use]
    pub const fn live_windows(&self) -> &LiveWindowSet { &self.previous_live }

    #[must_use]
    pub const fn engine(&self) -> &ReconciliationEngine { &self.engine }

    #[cfg(test)]
    pub(crate) const fn engine_mut(&mut self) -> &mut ReconciliationEngine { &mut self.engine }

    /// Replaces the slot registry. The next cycle is a full pass.
    pub fn replace_registry(&mut self, registry: SlotRegistry) {
        self.registry = self.registry.succeed(registry);
        self.force_full_pass = true;
        tracing::info!(
            revision = self.registry.revision(),
            slots = self.registry.len(),
            "slot registry replaced"
        );
    }

    pub fn set_capture_filter(&mut self, filter: CaptureFilter) {
        self.provider.set_filter(filter);
        self.force_full_pass = true;
    }

    pub fn set_excluded_handles(&mut self, handles: HashSet<WindowHandle>) {
        self.excluded_handles = handles;
        self.force_full_pass = true;
    }

    pub fn set_self_handles(&mut self, handles: HashSet<WindowHandle>) {
        self.self_handles = handles;
        self.force_full_pass = true;
    }

    pub const fn set_eviction_threshold(&mut self, threshold: usize) {
        self.engine.set_eviction_threshold(threshold);
    }

    /// Makes the next cycle skip change suppression.
    pub const fn request_full_pass(&mut self) { self.force_full_pass = true; }

    /// Runs one cycle.
    ///
    /// When neither the captured windows, the registry nor the app info cache
    /// changed since the last accepted cycle, nothing past capture runs.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let raw = self.provider.capture(&self.excluded_handles, &self.self_handles);
        let cache_generation = self.provider.cache().generation();

        if !self.force_full_pass
            && cache_generation == self.previous_cache_generation
            && self.previous_raw.as_ref() == Some(&raw)
        {
            tracing::trace!(windows = raw.len(), "windows unchanged, skipping cycle");
            return CycleOutcome::Unchanged;
        }

        let live = assign_instances(&raw, &self.previous_live);
        let previous = self.publisher.current();

        let snapshot = match self.engine.reconcile(&live, &self.registry, self.provider.cache(), &previous) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::error!(error = %err, "refusing to publish inconsistent snapshot");
                self.force_full_pass = true;
                return CycleOutcome::Rejected(err);
            }
        };

        self.previous_raw = Some(raw);
        self.previous_live = live;
        self.previous_cache_generation = cache_generation;
        self.force_full_pass = false;

        if snapshot == *previous {
            tracing::trace!("reconciled snapshot identical to published one");
            return CycleOutcome::Unchanged;
        }

        let slots = snapshot.len();
        self.publisher.publish(Arc::new(snapshot));
        tracing::debug!(
            slots,
            live = self.previous_live.len(),
            revision = self.registry.revision(),
            "published slot snapshot"
        );

        CycleOutcome::Published { slots }
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("provider", &self.provider)
            .field("engine", &self.engine)
            .field("registry_revision", &self.registry.revision())
            .field("live", &self.previous_live.len())
            .field("force_full_pass", &self.force_full_pass)
            .finish_non_exhaustive()
    }
}
