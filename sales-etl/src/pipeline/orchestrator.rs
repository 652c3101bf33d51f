//! Runs the pipeline end to end and accounts for every step.

use std::fs;
use std::io;
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use sales_core::{EtlError, Filter, Result, Table};
use serde::Serialize;
use tokio::task::{self, JoinError};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::{EtlConfig, TableSource};
use crate::observability::metrics;
use crate::pipeline::dataset::{self, WriteOptions};
use crate::pipeline::join;
use crate::pipeline::loader;
use crate::pipeline::transform::{self, TimestampPolicy};

/// One executed step, as it appears in the run report.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: String,
    pub rows: usize,
    pub duration_ms: u64,
}

/// Everything one run did, serializable for the optional report file.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub steps: Vec<StepReport>,
    pub rows_written: usize,
    pub partitions_written: usize,
    pub output_path: String,
}

/// End-to-end pipeline over one configuration.
pub struct EtlPipeline {
    config: EtlConfig,
}

impl EtlPipeline {
    pub fn new(config: EtlConfig) -> Self {
        Self { config }
    }

    /// Load the three source tables in parallel, clean and project them,
    /// join, and write the partitioned dataset. The first failing step
    /// stops the run.
    pub async fn run(&self) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let run_started = Instant::now();
        let started_at = Utc::now();
        info!("🚀 Starting ETL run {}", run_id);
        self.config.validate()?;

        let (orders, items, products, mut steps) = self.load_stage().await?;

        let policy = if self.config.transform.strict_timestamps {
            TimestampPolicy::Strict
        } else {
            TimestampPolicy::Coerce
        };
        let (orders, step) = run_step("clean_orders", format!("policy={policy:?}"), || {
            let cleaned = transform::clean_orders(&orders, policy)?;
            let rows = cleaned.len();
            Ok((cleaned, rows))
        })?;
        steps.push(step);

        let (items, step) = run_step("project_items", String::new(), || {
            let projected = transform::project_items(&items)?;
            let rows = projected.len();
            Ok((projected, rows))
        })?;
        steps.push(step);

        let (products, step) = run_step("project_products", String::new(), || {
            let projected = transform::project_products(&products)?;
            let rows = projected.len();
            Ok((projected, rows))
        })?;
        steps.push(step);

        let (joined, step) = run_step("join_sales", String::new(), || {
            let joined = join::join_sales(&orders, &items, &products)?;
            let rows = joined.len();
            Ok((joined, rows))
        })?;
        steps.push(step);

        let destination = self.config.output.path.clone();
        let options = WriteOptions {
            engine: self.config.output.engine,
            compression: self.config.output.compression,
            partition_ceiling_override: self.config.output.partition_ceiling_override,
        };
        let (summary, step) = run_step(
            "write_dataset",
            format!(
                "path={} engine={}",
                destination.display(),
                options.engine.as_str()
            ),
            || {
                let summary = dataset::write_dataset(&joined, &destination, &options)?;
                let rows = summary.rows_written;
                Ok((summary, rows))
            },
        )?;
        steps.push(step);

        let report = RunReport {
            run_id,
            started_at,
            completed_at: Utc::now(),
            steps,
            rows_written: summary.rows_written,
            partitions_written: summary.partitions_written,
            output_path: destination.display().to_string(),
        };
        info!(
            "🎉 ETL run {} completed: {} rows across {} partitions in {:?}",
            run_id,
            report.rows_written,
            report.partitions_written,
            run_started.elapsed()
        );

        if let Some(path) = self.config.output.report_path.clone() {
            persist_report(&report, &path)?;
        }
        Ok(report)
    }

    /// Read the written dataset back, filtered.
    pub fn read(&self, filters: &[Filter]) -> Result<Table> {
        info!(
            "🔍 Reading dataset at {} with {} filter(s)",
            self.config.output.path.display(),
            filters.len()
        );
        dataset::read_dataset(&self.config.output.path, filters)
    }

    async fn load_stage(&self) -> Result<(Table, Table, Table, Vec<StepReport>)> {
        let orders_source = self.config.tables.orders.clone();
        let items_source = self.config.tables.items.clone();
        let products_source = self.config.tables.products.clone();

        let (orders, items, products) = tokio::join!(
            task::spawn_blocking(move || logged_load("load_orders", "orders", &orders_source)),
            task::spawn_blocking(move || logged_load("load_items", "items", &items_source)),
            task::spawn_blocking(move || {
                logged_load("load_products", "products", &products_source)
            }),
        );
        let (orders, orders_step) = flatten_task(orders)?;
        let (items, items_step) = flatten_task(items)?;
        let (products, products_step) = flatten_task(products)?;
        Ok((
            orders,
            items,
            products,
            vec![orders_step, items_step, products_step],
        ))
    }
}

/// Load one source table with step logging, for use inside a blocking task.
fn logged_load(
    step: &'static str,
    table: &'static str,
    source: &TableSource,
) -> Result<(Table, StepReport)> {
    run_step(step, format!("path={}", source.path.display()), || {
        let loaded = loader::load_table(table, &source.path, source.delimiter()?)?;
        let rows = loaded.len();
        Ok((loaded, rows))
    })
}

/// Step middleware: start and completion logs, duration, metrics, and the
/// report entry. Failures log once here and propagate unchanged.
fn run_step<T>(
    step: &'static str,
    detail: String,
    work: impl FnOnce() -> Result<(T, usize)>,
) -> Result<(T, StepReport)> {
    let started = Instant::now();
    if detail.is_empty() {
        info!("🔄 Step '{}' starting", step);
    } else {
        info!("🔄 Step '{}' starting ({})", step, detail);
    }
    match work() {
        Ok((output, rows)) => {
            let duration = started.elapsed();
            info!("✅ Step '{}' completed: {} rows in {:?}", step, rows, duration);
            metrics::step::completed(step, duration.as_secs_f64());
            let report = StepReport {
                step: step.to_string(),
                rows,
                duration_ms: duration.as_millis() as u64,
            };
            Ok((output, report))
        }
        Err(e) => {
            error!("❌ Step '{}' failed: {}", step, e);
            metrics::step::failed(step);
            Err(e)
        }
    }
}

fn flatten_task<T>(joined: std::result::Result<Result<T>, JoinError>) -> Result<T> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(EtlError::Io(io::Error::other(e))),
    }
}

fn persist_report(report: &RunReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serde_json::to_string_pretty(report)?)?;
    info!("🧾 Run report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_step_reports_rows_and_passes_output_through() {
        let (value, report) = run_step("demo", String::new(), || Ok((41 + 1, 7))).unwrap();
        assert_eq!(value, 42);
        assert_eq!(report.step, "demo");
        assert_eq!(report.rows, 7);
    }

    #[test]
    fn test_run_step_propagates_errors() {
        let result: Result<((), StepReport)> =
            run_step("demo", String::new(), || Err(EtlError::Join("boom".into())));
        assert!(matches!(result, Err(EtlError::Join(_))));
    }
}
