//! Metrics declaration and recording.
//!
//! Everything here compiles to no-ops unless the `metrics` feature is on.

use afz_core::{FallbackKind, FetchContext};

use crate::strategy::StrategyKind;
use crate::sync::SyncReport;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    // Strategy metrics

    /// Responses produced by a strategy.
    pub static ref STRATEGY_RESPONSES: &'static str = {
        metrics::describe_counter!(
            "afz_strategy_responses_total",
            "Total number of responses produced by a caching strategy."
        );
        "afz_strategy_responses_total"
    };
    /// Strategy runs that ended in an error.
    pub static ref STRATEGY_FAILURES: &'static str = {
        metrics::describe_counter!(
            "afz_strategy_failures_total",
            "Total number of strategy runs that produced no response."
        );
        "afz_strategy_failures_total"
    };
    /// Fallback responses served.
    pub static ref FALLBACK_RESPONSES: &'static str = {
        metrics::describe_counter!(
            "afz_fallback_total",
            "Total number of offline fallback responses served."
        );
        "afz_fallback_total"
    };

    // Offload manager metrics

    /// Track number of offload tasks spawned.
    pub static ref OFFLOAD_TASKS_SPAWNED: &'static str = {
        metrics::describe_counter!(
            "afz_offload_tasks_spawned_total",
            "Total number of offload tasks spawned."
        );
        "afz_offload_tasks_spawned_total"
    };
    /// Track number of offload tasks completed successfully.
    pub static ref OFFLOAD_TASKS_COMPLETED: &'static str = {
        metrics::describe_counter!(
            "afz_offload_tasks_completed_total",
            "Total number of offload tasks completed successfully."
        );
        "afz_offload_tasks_completed_total"
    };
    /// Track number of offload tasks that timed out.
    pub static ref OFFLOAD_TASKS_TIMEOUT: &'static str = {
        metrics::describe_counter!(
            "afz_offload_tasks_timeout_total",
            "Total number of offload tasks that timed out."
        );
        "afz_offload_tasks_timeout_total"
    };
    /// Track number of offload tasks deduplicated (skipped).
    pub static ref OFFLOAD_TASKS_DEDUPLICATED: &'static str = {
        metrics::describe_counter!(
            "afz_offload_tasks_deduplicated_total",
            "Total number of revalidations skipped because one was already in flight."
        );
        "afz_offload_tasks_deduplicated_total"
    };
    /// Track number of offload tasks dropped at the concurrency limit.
    pub static ref OFFLOAD_TASKS_REJECTED: &'static str = {
        metrics::describe_counter!(
            "afz_offload_tasks_rejected_total",
            "Total number of offload tasks dropped at the concurrency limit."
        );
        "afz_offload_tasks_rejected_total"
    };
    /// Gauge of currently active offload tasks.
    pub static ref OFFLOAD_TASKS_ACTIVE: &'static str = {
        metrics::describe_gauge!(
            "afz_offload_tasks_active",
            "Number of currently active offload tasks."
        );
        "afz_offload_tasks_active"
    };
    /// Histogram of offload task duration.
    pub static ref OFFLOAD_TASK_DURATION: &'static str = {
        metrics::describe_histogram!(
            "afz_offload_task_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of offload tasks in seconds."
        );
        "afz_offload_task_duration_seconds"
    };

    // Background sync metrics

    /// Submissions delivered by background sync.
    pub static ref SYNC_DELIVERED: &'static str = {
        metrics::describe_counter!(
            "afz_sync_delivered_total",
            "Total number of queued submissions delivered."
        );
        "afz_sync_delivered_total"
    };
    /// Delivery attempts that left the submission pending.
    pub static ref SYNC_FAILED: &'static str = {
        metrics::describe_counter!(
            "afz_sync_failed_total",
            "Total number of delivery attempts that left a submission pending."
        );
        "afz_sync_failed_total"
    };
}

/// Records the outcome of one strategy run; `None` means it failed.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_strategy(kind: StrategyKind, ctx: Option<&FetchContext>) {
    match ctx {
        Some(ctx) => metrics::counter!(
            *STRATEGY_RESPONSES,
            "strategy" => kind.as_str(),
            "status" => ctx.status.as_str(),
            "source" => ctx.source.as_str().to_string()
        )
        .increment(1),
        None => metrics::counter!(*STRATEGY_FAILURES, "strategy" => kind.as_str()).increment(1),
    }
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_strategy(_kind: StrategyKind, _ctx: Option<&FetchContext>) {}

/// Records a fallback response.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_fallback(kind: FallbackKind) {
    metrics::counter!(*FALLBACK_RESPONSES, "kind" => kind.as_str()).increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_fallback(_kind: FallbackKind) {}

/// Records a sync pass.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_sync(report: &SyncReport) {
    metrics::counter!(*SYNC_DELIVERED).increment(report.delivered.len() as u64);
    metrics::counter!(*SYNC_FAILED).increment(report.pending.len() as u64);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_sync(_report: &SyncReport) {}
