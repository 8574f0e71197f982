//! Recurring poll job for a monitored address
//!
//! Each monitor owns one background task that ticks on a fixed interval,
//! pulls the most recent activity for its address, and pushes every new
//! transaction through the analyze, enhance, combine, alert pipeline.
//! Signatures that were already processed are suppressed through the dedup
//! store; everything else is scored and recorded.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use crate::analyzer::AnalyzerClient;
use crate::db::{self, DbPool};
use crate::dedup::DedupStore;
use crate::dispatch::AlertDispatcher;
use crate::enhancement::EnhancementClient;
use crate::error::AppResult;
use crate::metrics::MetricsState;
use crate::models::{ActivityItem, FullAnalysis, Monitor, SecurityAlert};

use super::registry::MonitorEntry;

/// Everything a poll tick needs, shared by all monitor jobs
pub struct PollerContext {
    pub dedup: Arc<dyn DedupStore>,
    pub analyzer: AnalyzerClient,
    pub enhancement: EnhancementClient,
    pub dispatcher: AlertDispatcher,
    pub history: DbPool,
    /// Recent activity items fetched per tick
    pub activity_limit: usize,
    /// Alert when the combined score is strictly above this
    pub risk_threshold: f64,
    /// How long a processed signature stays suppressed
    pub dedup_ttl: Duration,
    pub metrics: Option<Arc<MetricsState>>,
}

/// Outcome counts for one poll tick
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    /// Activity items returned by the analyzer
    pub fetched: usize,
    /// Items suppressed by the dedup store
    pub skipped: usize,
    /// Items that completed the full pipeline
    pub analyzed: usize,
    /// Analyzed items that crossed the risk threshold
    pub alerts: usize,
    /// Items that failed mid-pipeline and will be retried next tick
    pub failures: usize,
}

enum ItemOutcome {
    Skipped,
    Analyzed { alerted: bool },
}

/// Run the recurring poll loop for one monitor until cancelled
pub async fn run_monitor_job(
    ctx: Arc<PollerContext>,
    monitors: Arc<DashMap<String, MonitorEntry>>,
    monitor: Monitor,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    tracing::info!(
        monitor_id = %monitor.monitor_id,
        address = %monitor.address,
        network = %monitor.network,
        interval_ms = interval.as_millis() as u64,
        "Starting monitor poll job"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                tracing::info!(monitor_id = %monitor.monitor_id, "Monitor poll job shutting down");
                break;
            }
            _ = ticker.tick() => {
                // Stamp the shared entry so status reads see live progress
                if let Some(mut entry) = monitors.get_mut(&monitor.monitor_id) {
                    entry.monitor.last_checked_at = Some(Utc::now());
                }

                match poll_once(&ctx, &monitor).await {
                    Ok(summary) => {
                        tracing::debug!(
                            monitor_id = %monitor.monitor_id,
                            fetched = summary.fetched,
                            skipped = summary.skipped,
                            analyzed = summary.analyzed,
                            alerts = summary.alerts,
                            failures = summary.failures,
                            "Poll tick complete"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            monitor_id = %monitor.monitor_id,
                            address = %monitor.address,
                            error = %e,
                            "Activity fetch failed, skipping poll tick"
                        );
                    }
                }
            }
        }
    }
}

/// Execute one poll tick for a monitor.
///
/// A fetch failure aborts the whole tick; a failure on an individual item is
/// counted, logged, and leaves that signature unmarked so the next tick
/// retries it.
pub async fn poll_once(ctx: &PollerContext, monitor: &Monitor) -> AppResult<TickSummary> {
    let items = ctx
        .analyzer
        .recent_activity(&monitor.address, &monitor.network, ctx.activity_limit)
        .await?;

    let mut summary = TickSummary {
        fetched: items.len(),
        ..Default::default()
    };

    for item in items {
        match process_item(ctx, monitor, &item).await {
            Ok(ItemOutcome::Skipped) => summary.skipped += 1,
            Ok(ItemOutcome::Analyzed { alerted }) => {
                summary.analyzed += 1;
                if alerted {
                    summary.alerts += 1;
                }
            }
            Err(e) => {
                summary.failures += 1;
                tracing::warn!(
                    monitor_id = %monitor.monitor_id,
                    signature = %item.signature,
                    error = %e,
                    "Transaction analysis failed"
                );
            }
        }
    }

    Ok(summary)
}

/// Push one activity item through the pipeline
async fn process_item(
    ctx: &PollerContext,
    monitor: &Monitor,
    item: &ActivityItem,
) -> AppResult<ItemOutcome> {
    // A dedup lookup failure must not stall the pipeline; treat the
    // signature as unprocessed and accept a possible duplicate alert.
    match ctx.dedup.has(&item.signature).await {
        Ok(true) => {
            tracing::trace!(signature = %item.signature, "Already processed, skipping");
            return Ok(ItemOutcome::Skipped);
        }
        Ok(false) => {}
        Err(e) => {
            tracing::warn!(
                signature = %item.signature,
                error = %e,
                "Dedup lookup failed, treating signature as unprocessed"
            );
        }
    }

    let analysis = ctx.analyzer.analyze(&item.signature, &monitor.network).await?;
    if let Some(metrics) = &ctx.metrics {
        metrics.analyses_total.inc();
    }

    let enhancement = ctx.enhancement.enhance(&analysis).await;
    let full = FullAnalysis::combine(
        item.signature.clone(),
        monitor.network.clone(),
        analysis,
        enhancement,
    );

    let alerted = full.risk_score > ctx.risk_threshold;

    record_history(ctx, monitor, &full, alerted).await;

    if alerted {
        let alert = SecurityAlert::from_analysis(monitor, &full);
        ctx.dispatcher.dispatch(&alert, monitor.webhook_url.as_deref());
    }

    // Suppress reprocessing whether or not it alerted. A failed mark is
    // logged and the item may be re-analyzed next tick.
    if let Err(e) = ctx.dedup.mark_processed(&item.signature, ctx.dedup_ttl).await {
        tracing::warn!(
            signature = %item.signature,
            error = %e,
            "Failed to mark signature processed"
        );
    }

    Ok(ItemOutcome::Analyzed { alerted })
}

/// Best-effort history write; never fails the tick
async fn record_history(ctx: &PollerContext, monitor: &Monitor, full: &FullAnalysis, alerted: bool) {
    let json = match serde_json::to_string(full) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(
                signature = %full.signature,
                error = %e,
                "Failed to serialize analysis for history"
            );
            return;
        }
    };

    if let Err(e) = db::record_analysis(
        &ctx.history,
        &full.signature,
        &monitor.address,
        &monitor.network,
        full.risk_score,
        alerted,
        &json,
    )
    .await
    {
        tracing::warn!(
            signature = %full.signature,
            error = %e,
            "Failed to record analysis history"
        );
    }
}
