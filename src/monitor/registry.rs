//! Monitor lifecycle registry
//!
//! Owns the map of active monitors and the recurring poll job behind each
//! one. Starting a monitor with an id that is already registered cancels the
//! old job and replaces it, so an id never has two schedules. Every job token
//! is a child of the registry's shutdown token, which gives the whole
//! scheduler one switch to flip at process exit.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};
use crate::models::{Monitor, MonitorConfig, MonitorState, MonitorStatus};

use super::poller::{run_monitor_job, PollerContext};

/// A registered monitor and the cancel handle for its poll job
pub struct MonitorEntry {
    pub monitor: Monitor,
    pub(crate) cancel: CancellationToken,
}

/// Registry of active monitors and their recurring poll jobs
pub struct MonitorRegistry {
    monitors: Arc<DashMap<String, MonitorEntry>>,
    ctx: Arc<PollerContext>,
    poll_interval: Duration,
    default_network: String,
    shutdown: CancellationToken,
}

impl MonitorRegistry {
    pub fn new(
        ctx: Arc<PollerContext>,
        poll_interval: Duration,
        default_network: impl Into<String>,
    ) -> Self {
        Self {
            monitors: Arc::new(DashMap::new()),
            ctx,
            poll_interval,
            default_network: default_network.into(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Start (or replace) a monitor and spawn its recurring poll job.
    ///
    /// The insert returns any previous entry for the same id, whose job is
    /// cancelled before the new one is spawned.
    pub fn start(&self, config: MonitorConfig) -> Monitor {
        let monitor = Monitor::from_config(config, &self.default_network);
        let cancel = self.shutdown.child_token();

        let entry = MonitorEntry {
            monitor: monitor.clone(),
            cancel: cancel.clone(),
        };
        if let Some(old) = self.monitors.insert(monitor.monitor_id.clone(), entry) {
            old.cancel.cancel();
            tracing::info!(
                monitor_id = %monitor.monitor_id,
                "Replaced existing monitor schedule"
            );
        }

        tokio::spawn(run_monitor_job(
            self.ctx.clone(),
            self.monitors.clone(),
            monitor.clone(),
            self.poll_interval,
            cancel,
        ));

        tracing::info!(
            monitor_id = %monitor.monitor_id,
            address = %monitor.address,
            network = %monitor.network,
            "Monitor started"
        );

        monitor
    }

    /// Stop a monitor: remove it and cancel its job.
    ///
    /// A tick that is already in flight is allowed to finish and may still
    /// alert; removal only prevents the next schedule.
    pub fn stop(&self, monitor_id: &str) -> AppResult<Monitor> {
        let (_, entry) = self
            .monitors
            .remove(monitor_id)
            .ok_or_else(|| AppError::NotFound(format!("monitor {} not found", monitor_id)))?;

        entry.cancel.cancel();
        tracing::info!(monitor_id = %monitor_id, "Monitor stopped");

        let mut monitor = entry.monitor;
        monitor.status = MonitorState::Inactive;
        Ok(monitor)
    }

    /// Snapshot one monitor with its scheduling state
    pub fn status(&self, monitor_id: &str) -> AppResult<MonitorStatus> {
        let entry = self
            .monitors
            .get(monitor_id)
            .ok_or_else(|| AppError::NotFound(format!("monitor {} not found", monitor_id)))?;

        Ok(MonitorStatus {
            monitor: entry.monitor.clone(),
            scheduled: !entry.cancel.is_cancelled(),
        })
    }

    /// Snapshot every registered monitor
    pub fn list(&self) -> Vec<MonitorStatus> {
        self.monitors
            .iter()
            .map(|entry| MonitorStatus {
                monitor: entry.monitor.clone(),
                scheduled: !entry.cancel.is_cancelled(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Cancel every poll job; entries stay readable for a final drain
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        tracing::info!(count = self.monitors.len(), "All monitor jobs cancelled");
    }
}
