//! Breakpoints that survive debugger restarts and target rebuilds.
//!
//! - [`record`]: the persisted record and its live-session counterpart
//! - [`reconcile`]: re-deriving valid lines after a rebuild
//! - [`store`]: the owning store, persistence, and debuggee restore
//! - [`list`]: the human-editable list format

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod list;
pub mod reconcile;
pub mod record;
pub mod store;

pub use list::{parse_list, render_list, ListError};
pub use reconcile::{reconcile, DropReason, ReconcileOutcome};
pub use record::{line_text, LiveBreakpoint, LoadDetail, PersistedBreakpoint};
pub use store::{
    storage_path, BreakpointHost, BreakpointStore, HostError, ReconcileStats, StoreError,
};
