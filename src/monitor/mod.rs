//! Monitor scheduling and the per-address poll pipeline

pub mod poller;
pub mod registry;

pub use poller::{poll_once, run_monitor_job, PollerContext, TickSummary};
pub use registry::{MonitorEntry, MonitorRegistry};
