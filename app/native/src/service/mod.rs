//! Periodic reconciliation service.
//!
//! The service task owns a [`Reconciler`] and runs one cycle per tick. Other
//! parts of the application talk to it through a [`ServiceHandle`]; commands
//! are only handled between cycles, so cycles never overlap and pausing never
//! interrupts one.
//!
//! # Panic Recovery
//!
//! Each cycle runs under `catch_unwind`. A panicking cycle is logged and
//! abandoned, the previous snapshot stays published, and the next cycle is a
//! forced full pass.

mod handle;
mod messages;
mod reconciler;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

pub use handle::ServiceHandle;
pub use messages::{CycleOutcome, ServiceMessage, ServiceStatus};
pub use reconciler::Reconciler;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

/// Channel buffer size for service commands.
const CHANNEL_BUFFER_SIZE: usize = 64;

/// Shortest accepted cycle interval.
pub const MIN_INTERVAL: Duration = Duration::from_millis(50);

/// The periodic service task.
pub struct ReconcileService {
    reconciler: Reconciler,
    receiver: mpsc::Receiver<ServiceMessage>,
    interval: Duration,
    paused: bool,
    cycles: u64,
    published: u64,
    last_outcome: Option<CycleOutcome>,
}

impl ReconcileService {
    /// Spawns the service on the current tokio runtime.
    ///
    /// The first cycle runs immediately.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(reconciler: Reconciler, interval: Duration) -> (ServiceHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let handle = ServiceHandle::new(sender, reconciler.subscribe());

        let service = Self {
            reconciler,
            receiver,
            interval: interval.max(MIN_INTERVAL),
            paused: false,
            cycles: 0,
            published: 0,
            last_outcome: None,
        };

        tracing::debug!(interval_ms = service.interval.as_millis(), "spawning reconciliation service");
        let task = tokio::spawn(service.run());

        (handle, task)
    }

    async fn run(mut self) {
        let mut ticker = new_ticker(self.interval);

        loop {
            tokio::select! {
                biased;

                message = self.receiver.recv() => {
                    match message {
                        None | Some(ServiceMessage::Shutdown) => break,
                        Some(message) => self.handle_message(message, &mut ticker),
                    }
                }
                _ = ticker.tick(), if !self.paused => self.run_cycle(),
            }
        }

        tracing::debug!(cycles = self.cycles, "reconciliation service stopped");
    }

    fn run_cycle(&mut self) {
        self.cycles += 1;

        let result = catch_unwind(AssertUnwindSafe(|| self.reconciler.run_cycle()));

        let outcome = result.unwrap_or_else(|panic_info| {
            let panic_msg = panic_info
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic_info.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());

            tracing::error!(cycle = self.cycles, panic = %panic_msg, "reconciliation cycle panicked");
            self.reconciler.request_full_pass();
            CycleOutcome::Panicked(panic_msg)
        });

        if matches!(outcome, CycleOutcome::Published { .. }) {
            self.published += 1;
        }
        self.last_outcome = Some(outcome);
    }

    fn handle_message(&mut self, message: ServiceMessage, ticker: &mut Interval) {
        tracing::trace!(message = message.name(), "service message");

        match message {
            ServiceMessage::Pause => {
                self.paused = true;
                tracing::debug!("reconciliation paused");
            }
            ServiceMessage::Resume => {
                if self.paused {
                    self.paused = false;
                    ticker.reset_immediately();
                    tracing::debug!("reconciliation resumed");
                }
            }
            ServiceMessage::RefreshNow => {
                self.reconciler.request_full_pass();
                if !self.paused {
                    self.run_cycle();
                }
            }
            ServiceMessage::ReplaceRegistry(registry) => {
                self.reconciler.replace_registry(registry);
                if !self.paused {
                    self.run_cycle();
                }
            }
            ServiceMessage::SetCaptureFilter(filter) => self.reconciler.set_capture_filter(filter),
            ServiceMessage::SetExcludedHandles(handles) => self.reconciler.set_excluded_handles(handles),
            ServiceMessage::SetSelfHandles(handles) => self.reconciler.set_self_handles(handles),
            ServiceMessage::SetEvictionThreshold(threshold) => {
                self.reconciler.set_eviction_threshold(threshold);
            }
            ServiceMessage::SetInterval(interval) => {
                let interval = interval.max(MIN_INTERVAL);
                if interval != self.interval {
                    self.interval = interval;
                    *ticker = new_ticker(interval);
                    tracing::debug!(interval_ms = interval.as_millis(), "cycle interval changed");
                }
            }
            ServiceMessage::Status { respond_to } => {
                let _ = respond_to.send(self.status());
            }
            ServiceMessage::Shutdown => {}
        }
    }

    fn status(&self) -> ServiceStatus {
        ServiceStatus {
            paused: self.paused,
            interval: self.interval,
            cycles: self.cycles,
            published: self.published,
            registry_revision: self.reconciler.registry().revision(),
            live_windows: self.reconciler.live_windows().len(),
            claims: self.reconciler.engine().claims_len(),
            last_outcome: self.last_outcome.clone(),
        }
    }
}

fn new_ticker(interval: Duration) -> Interval {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}
