//! Window/slot reconciliation engine.
//!
//! One cycle flows through the submodules in order:
//!
//! ```text
//! capture -> instances -> reconcile -> publisher
//! ```
//!
//! - [`capture`]: filtered `(handle, title, exeName)` set from the OS
//! - [`instances`]: stable, dense instance numbers per `(title, exeName)`
//! - [`reconcile`]: three-wave slot matching with a cross-cycle side table
//! - [`publisher`]: latest-value snapshot delivery
//!
//! [`rules`] holds the filtering and title normalization rules and
//! [`app_info`] the friendly-name cache the stages read from.

pub mod app_info;
pub mod capture;
pub mod instances;
pub mod publisher;
pub mod reconcile;
pub mod rules;
pub mod types;

pub use app_info::{AppInfo, AppInfoCache, AppInfoResolver, ExeStemResolver, LookupQueue};
pub use capture::WindowSnapshotProvider;
pub use instances::assign_instances;
pub use publisher::{SnapshotPublisher, SnapshotReceiver};
pub use reconcile::{DEFAULT_EVICTION_THRESHOLD, ReconciliationEngine, check_invariants};
pub use rules::CaptureFilter;
pub use types::{
    LiveWindowSet, RawWindowSet, Slot, SlotAssignmentSnapshot, SlotRegistry, TaskProperties, TaskType,
    WindowHandle, WindowIdentity, WindowInfo,
};
