//! Metrics for the ETL pipeline, using Prometheus naming conventions.
//!
//! Recorders go through the `metrics` facade and are no-ops until a recorder
//! is installed; this binary does not ship an exporter.

use std::fmt;

/// Enum representing all metric names used by the pipeline.
/// Every recorder below goes through it; no call site spells a raw name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    StepCompleted,
    StepFailed,
    StepDuration,
    RowsLoaded,
    OrdersKept,
    OrdersDroppedStatus,
    OrdersDroppedTimestamp,
    RowsJoined,
    RowsWritten,
    PartitionsWritten,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::StepCompleted => "sales_etl_step_completed_total",
            MetricName::StepFailed => "sales_etl_step_failed_total",
            MetricName::StepDuration => "sales_etl_step_duration_seconds",
            MetricName::RowsLoaded => "sales_etl_rows_loaded_total",
            MetricName::OrdersKept => "sales_etl_orders_kept_total",
            MetricName::OrdersDroppedStatus => "sales_etl_orders_dropped_status_total",
            MetricName::OrdersDroppedTimestamp => "sales_etl_orders_dropped_timestamp_total",
            MetricName::RowsJoined => "sales_etl_rows_joined_total",
            MetricName::RowsWritten => "sales_etl_rows_written_total",
            MetricName::PartitionsWritten => "sales_etl_partitions_written",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Step Metrics
// ============================================================================

pub mod step {
    use super::MetricName;

    /// Record a completed step with its duration.
    pub fn completed(step: &'static str, secs: f64) {
        ::metrics::counter!(MetricName::StepCompleted.as_str(), "step" => step).increment(1);
        ::metrics::histogram!(MetricName::StepDuration.as_str(), "step" => step).record(secs);
    }

    /// Record a failed step.
    pub fn failed(step: &'static str) {
        ::metrics::counter!(MetricName::StepFailed.as_str(), "step" => step).increment(1);
    }
}

// ============================================================================
// Loader Metrics
// ============================================================================

pub mod loader {
    use super::MetricName;

    /// Record rows loaded for a named source table.
    pub fn rows_loaded(table: &'static str, rows: usize) {
        ::metrics::counter!(MetricName::RowsLoaded.as_str(), "table" => table)
            .increment(rows as u64);
    }
}

// ============================================================================
// Transform Metrics
// ============================================================================

pub mod transform {
    use super::MetricName;

    /// Record the outcome of order cleaning.
    pub fn orders_cleaned(kept: usize, dropped_status: usize, dropped_timestamp: usize) {
        ::metrics::counter!(MetricName::OrdersKept.as_str()).increment(kept as u64);
        ::metrics::counter!(MetricName::OrdersDroppedStatus.as_str())
            .increment(dropped_status as u64);
        ::metrics::counter!(MetricName::OrdersDroppedTimestamp.as_str())
            .increment(dropped_timestamp as u64);
    }
}

// ============================================================================
// Join Metrics
// ============================================================================

pub mod join {
    use super::MetricName;

    /// Record rows produced by a join.
    pub fn rows_joined(rows: usize) {
        ::metrics::counter!(MetricName::RowsJoined.as_str()).increment(rows as u64);
    }
}

// ============================================================================
// Writer Metrics
// ============================================================================

pub mod writer {
    use super::MetricName;

    /// Record a completed dataset write.
    pub fn written(rows: usize, partitions: usize) {
        ::metrics::counter!(MetricName::RowsWritten.as_str()).increment(rows as u64);
        ::metrics::histogram!(MetricName::PartitionsWritten.as_str()).record(partitions as f64);
    }
}
