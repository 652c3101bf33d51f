//! Read side: filtered read-back of a written dataset.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use arrow::array::{Array, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::DateTime;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use sales_core::{EtlError, Filter, Result, Table, Value};
use tracing::debug;

use crate::constants::PARTITION_COLUMNS;

use super::partition;

/// Read a dataset back into a table, keeping only rows that satisfy every
/// filter.
///
/// Partition directories whose decoded value fails a filter on that column
/// are skipped without opening their files; the filters run again per row,
/// so predicates on data columns work the same way. Result columns are the
/// data columns in file order followed by the partition columns, and rows
/// come back grouped by partition path in lexical order.
pub fn read_dataset(root: &Path, filters: &[Filter]) -> Result<Table> {
    let dirs = partition_dirs(root, filters)?;

    let mut table = Table::default();
    let mut filter_at: Vec<usize> = Vec::new();
    let mut initialized = false;

    for (dir, key) in &dirs {
        for file_name in parquet_files(dir)? {
            let path = dir.join(&file_name);
            let file = File::open(&path).map_err(|e| EtlError::File {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
            for batch in reader {
                let batch = batch?;
                if !initialized {
                    table = table_for(&batch);
                    filter_at = filters
                        .iter()
                        .map(|filter| table.require_column("dataset", &filter.column))
                        .collect::<Result<_>>()?;
                    initialized = true;
                } else {
                    check_columns(&table, &batch)?;
                }
                append_rows(&mut table, &batch, key, filters, &filter_at)?;
            }
        }
    }

    debug!(
        "📖 Read {} rows from {} partition directories under {}",
        table.len(),
        dirs.len(),
        root.display()
    );
    Ok(table)
}

/// Walk one directory level per partition column, pruning with any filters
/// that name that column. Returns each surviving leaf directory with its
/// decoded partition key.
fn partition_dirs(root: &Path, filters: &[Filter]) -> Result<Vec<(PathBuf, Vec<Value>)>> {
    let mut found = vec![(root.to_path_buf(), Vec::new())];
    for column in PARTITION_COLUMNS {
        let mut next = Vec::new();
        for (dir, key) in found {
            for name in sorted_subdirs(&dir)? {
                let Some((segment_column, encoded)) = partition::parse_segment(&name) else {
                    continue;
                };
                if segment_column != column {
                    continue;
                }
                let cell = partition::decode_value(encoded);
                let survives = filters
                    .iter()
                    .filter(|filter| filter.column == column)
                    .all(|filter| filter.matches(&cell));
                if !survives {
                    continue;
                }
                let mut key = key.clone();
                key.push(cell);
                next.push((dir.join(&name), key));
            }
        }
        found = next;
    }
    Ok(found)
}

fn sorted_subdirs(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| EtlError::File {
        path: dir.display().to_string(),
        message: e.to_string(),
    })?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

fn parquet_files(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| EtlError::File {
        path: dir.display().to_string(),
        message: e.to_string(),
    })?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_file() && name.ends_with(".parquet") {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Result table shape for the first batch seen: the file's columns plus the
/// partition columns.
fn table_for(batch: &RecordBatch) -> Table {
    let mut columns: Vec<String> = batch
        .schema()
        .fields()
        .iter()
        .map(|field| field.name().clone())
        .collect();
    columns.extend(PARTITION_COLUMNS.iter().map(|column| column.to_string()));
    Table::new(columns)
}

fn check_columns(table: &Table, batch: &RecordBatch) -> Result<()> {
    let data_width = table.width() - PARTITION_COLUMNS.len();
    let expected = &table.columns()[..data_width];
    let schema = batch.schema();
    let found: Vec<&String> = schema
        .fields()
        .iter()
        .map(|field| field.name())
        .collect();
    if expected.iter().ne(found.iter().copied()) {
        return Err(EtlError::Parse(format!(
            "inconsistent columns across dataset files: expected {expected:?}, found {found:?}"
        )));
    }
    Ok(())
}

fn append_rows(
    table: &mut Table,
    batch: &RecordBatch,
    key: &[Value],
    filters: &[Filter],
    filter_at: &[usize],
) -> Result<()> {
    for row in 0..batch.num_rows() {
        let mut cells = Vec::with_capacity(batch.num_columns() + key.len());
        for column in 0..batch.num_columns() {
            cells.push(cell_at(batch, column, row)?);
        }
        cells.extend(key.iter().cloned());

        let keep = filters
            .iter()
            .zip(filter_at)
            .all(|(filter, &at)| filter.matches(&cells[at]));
        if keep {
            table.push_row(cells)?;
        }
    }
    Ok(())
}

fn cell_at(batch: &RecordBatch, column: usize, row: usize) -> Result<Value> {
    let array = batch.column(column);
    if array.is_null(row) {
        return Ok(Value::Null);
    }
    let name = batch.schema().field(column).name().clone();
    match array.data_type() {
        DataType::Utf8 => {
            let strings = downcast::<StringArray>(array, &name)?;
            Ok(Value::Str(strings.value(row).to_string()))
        }
        DataType::Int64 => {
            let ints = downcast::<Int64Array>(array, &name)?;
            Ok(Value::Int(ints.value(row)))
        }
        DataType::Float64 => {
            let floats = downcast::<Float64Array>(array, &name)?;
            Ok(Value::Float(floats.value(row)))
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            let timestamps = downcast::<TimestampMicrosecondArray>(array, &name)?;
            Ok(DateTime::from_timestamp_micros(timestamps.value(row))
                .map(|ts| Value::Timestamp(ts.naive_utc()))
                .unwrap_or(Value::Null))
        }
        other => Err(EtlError::Parse(format!(
            "unsupported type {other} for column '{name}' in dataset file"
        ))),
    }
}

fn downcast<'a, A: 'static>(array: &'a dyn Array, name: &str) -> Result<&'a A> {
    array
        .as_any()
        .downcast_ref::<A>()
        .ok_or_else(|| EtlError::Parse(format!("column '{name}' does not match its declared type")))
}
