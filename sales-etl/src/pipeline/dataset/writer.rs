//! Write side: one parquet file per partition directory.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use sales_core::{EtlError, Result, Table, Value};
use tracing::{debug, warn};

use crate::constants::{PARTITION_COLUMNS, PRODUCT_ID};
use crate::observability::metrics;

use super::options::{WriteOptions, DEFAULT_PARTITION_CEILING};
use super::partition;

/// What one dataset write did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub rows_written: usize,
    pub partitions_written: usize,
    /// The ceiling the write ran under; `None` for the uncapped engine.
    pub effective_ceiling: Option<usize>,
}

/// Arrow-facing type of one table column, taken from its first non-null
/// cell. An all-null column lands as nullable Utf8.
#[derive(Debug, Clone, Copy)]
enum ColumnKind {
    Str,
    Int,
    Float,
    Timestamp,
}

impl ColumnKind {
    fn of(table: &Table, position: usize) -> ColumnKind {
        for row in table.rows() {
            match &row[position] {
                Value::Str(_) => return ColumnKind::Str,
                Value::Int(_) => return ColumnKind::Int,
                Value::Float(_) => return ColumnKind::Float,
                Value::Timestamp(_) => return ColumnKind::Timestamp,
                Value::Null => continue,
            }
        }
        ColumnKind::Str
    }

    fn data_type(self) -> DataType {
        match self {
            ColumnKind::Str => DataType::Utf8,
            ColumnKind::Int => DataType::Int64,
            ColumnKind::Float => DataType::Float64,
            ColumnKind::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
        }
    }
}

/// Replace the dataset under `destination` with the given table, one
/// directory per distinct `product_category_name`/`product_id` pair and one
/// `part-0.parquet` per directory. Partition values live in the directory
/// names only, never in the data files.
///
/// With the capped engine the write refuses to create more directories than
/// the partition ceiling. When the distinct product count already exceeds
/// the ceiling, the ceiling is raised to that count first, with a warning,
/// so wide-but-honest datasets still write. A refused write leaves any
/// previous dataset in place; past that point the clear and the write are
/// not atomic, and a crash in between leaves the destination empty.
pub fn write_dataset(
    table: &Table,
    destination: &Path,
    options: &WriteOptions,
) -> Result<WriteSummary> {
    let key_at = PARTITION_COLUMNS
        .iter()
        .map(|column| table.require_column("joined", column))
        .collect::<Result<Vec<_>>>()?;

    let effective_ceiling = if options.engine.enforces_ceiling() {
        let mut ceiling = options
            .partition_ceiling_override
            .unwrap_or(DEFAULT_PARTITION_CEILING);
        let distinct_products = table.distinct_count("joined", PRODUCT_ID)?;
        if distinct_products > ceiling {
            warn!(
                "⚠️ Raising partition ceiling from {} to {} distinct products",
                ceiling, distinct_products
            );
            ceiling = distinct_products;
        }
        Some(ceiling)
    } else {
        None
    };

    let mut groups: BTreeMap<Vec<String>, Vec<&Vec<Value>>> = BTreeMap::new();
    for row in table.rows() {
        let key = key_at
            .iter()
            .map(|&position| partition::encode_value(&row[position]))
            .collect();
        groups.entry(key).or_default().push(row);
    }

    if let Some(ceiling) = effective_ceiling {
        if groups.len() > ceiling {
            return Err(EtlError::Write {
                path: destination.display().to_string(),
                message: format!(
                    "refusing to write {} partitions, above the ceiling of {}",
                    groups.len(),
                    ceiling
                ),
            });
        }
    }

    clear_destination(destination)?;

    let data_at: Vec<usize> = (0..table.width()).filter(|i| !key_at.contains(i)).collect();
    let kinds: Vec<ColumnKind> = data_at
        .iter()
        .map(|&position| ColumnKind::of(table, position))
        .collect();
    let fields: Vec<Field> = data_at
        .iter()
        .zip(&kinds)
        .map(|(&position, &kind)| {
            Field::new(table.columns()[position].clone(), kind.data_type(), true)
        })
        .collect();
    let schema = Arc::new(Schema::new(fields));
    let properties = WriterProperties::builder()
        .set_compression(options.compression.to_parquet())
        .build();

    for (key, rows) in &groups {
        let mut dir = destination.to_path_buf();
        for (column, encoded) in PARTITION_COLUMNS.iter().zip(key) {
            dir.push(format!("{column}={encoded}"));
        }
        fs::create_dir_all(&dir).map_err(|e| EtlError::Write {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;

        let arrays: Vec<ArrayRef> = data_at
            .iter()
            .zip(&kinds)
            .map(|(&position, &kind)| column_array(rows, position, kind))
            .collect();
        let batch = RecordBatch::try_new(schema.clone(), arrays)?;

        let path = dir.join("part-0.parquet");
        let file = File::create(&path).map_err(|e| EtlError::Write {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(properties.clone()))?;
        writer.write(&batch)?;
        writer.close()?;
    }

    let summary = WriteSummary {
        rows_written: table.len(),
        partitions_written: groups.len(),
        effective_ceiling,
    };
    debug!(
        "💾 Wrote {} rows into {} partitions under {}",
        summary.rows_written,
        summary.partitions_written,
        destination.display()
    );
    metrics::writer::written(summary.rows_written, summary.partitions_written);
    Ok(summary)
}

/// Remove any previous dataset, then recreate the (empty) root.
fn clear_destination(destination: &Path) -> Result<()> {
    match fs::remove_dir_all(destination) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(EtlError::Write {
                path: destination.display().to_string(),
                message: e.to_string(),
            })
        }
    }
    fs::create_dir_all(destination).map_err(|e| EtlError::Write {
        path: destination.display().to_string(),
        message: e.to_string(),
    })
}

fn column_array(rows: &[&Vec<Value>], position: usize, kind: ColumnKind) -> ArrayRef {
    match kind {
        ColumnKind::Str => {
            let values: Vec<Option<String>> =
                rows.iter().map(|row| row[position].canonical()).collect();
            Arc::new(StringArray::from(values))
        }
        ColumnKind::Int => {
            let values: Vec<Option<i64>> = rows.iter().map(|row| row[position].as_int()).collect();
            Arc::new(Int64Array::from(values))
        }
        ColumnKind::Float => {
            let values: Vec<Option<f64>> =
                rows.iter().map(|row| row[position].as_float()).collect();
            Arc::new(Float64Array::from(values))
        }
        ColumnKind::Timestamp => {
            let values: Vec<Option<i64>> = rows
                .iter()
                .map(|row| {
                    row[position]
                        .as_timestamp()
                        .map(|ts| ts.and_utc().timestamp_micros())
                })
                .collect();
            Arc::new(TimestampMicrosecondArray::from(values))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::dataset::options::Engine;
    use crate::pipeline::dataset::HIVE_DEFAULT_PARTITION;

    fn s(raw: &str) -> Value {
        Value::Str(raw.into())
    }

    fn sales_table(rows: Vec<(&str, f64, &str, Option<&str>)>) -> Table {
        let mut table = Table::new(
            ["order_id", "price", "product_id", "product_category_name"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        );
        for (order, price, product, category) in rows {
            table
                .push_row(vec![
                    s(order),
                    Value::Float(price),
                    s(product),
                    category.map_or(Value::Null, s),
                ])
                .unwrap();
        }
        table
    }

    #[test]
    fn test_write_creates_hive_layout() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("sales");
        let table = sales_table(vec![
            ("o1", 49.9, "p1", Some("moveis_decoracao")),
            ("o2", 12.0, "p2", Some("bebes")),
            ("o3", 58.9, "p1", Some("moveis_decoracao")),
        ]);

        let summary = write_dataset(&table, &root, &WriteOptions::default()).unwrap();
        assert_eq!(summary.rows_written, 3);
        assert_eq!(summary.partitions_written, 2);
        assert_eq!(summary.effective_ceiling, Some(DEFAULT_PARTITION_CEILING));

        let part = root
            .join("product_category_name=moveis_decoracao")
            .join("product_id=p1")
            .join("part-0.parquet");
        assert!(part.is_file());
    }

    #[test]
    fn test_null_category_lands_in_hive_default_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("sales");
        let table = sales_table(vec![("o1", 5.0, "p1", None)]);

        write_dataset(&table, &root, &WriteOptions::default()).unwrap();
        let part = root
            .join(format!("product_category_name={HIVE_DEFAULT_PARTITION}"))
            .join("product_id=p1")
            .join("part-0.parquet");
        assert!(part.is_file());
    }

    #[test]
    fn test_rewrite_replaces_previous_partitions() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("sales");

        let first = sales_table(vec![("o1", 5.0, "p1", Some("bebes"))]);
        write_dataset(&first, &root, &WriteOptions::default()).unwrap();
        let second = sales_table(vec![("o2", 7.0, "p2", Some("esporte_lazer"))]);
        write_dataset(&second, &root, &WriteOptions::default()).unwrap();

        assert!(!root.join("product_category_name=bebes").exists());
        assert!(root.join("product_category_name=esporte_lazer").exists());
    }

    #[test]
    fn test_ceiling_is_raised_to_distinct_products() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("sales");
        let table = sales_table(vec![
            ("o1", 1.0, "p1", Some("a")),
            ("o2", 2.0, "p2", Some("a")),
            ("o3", 3.0, "p3", Some("b")),
        ]);
        let options = WriteOptions {
            partition_ceiling_override: Some(1),
            ..WriteOptions::default()
        };

        let summary = write_dataset(&table, &root, &options).unwrap();
        assert_eq!(summary.partitions_written, 3);
        assert_eq!(summary.effective_ceiling, Some(3));
    }

    #[test]
    fn test_capped_refusal_keeps_previous_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("sales");

        let first = sales_table(vec![("o1", 5.0, "p1", Some("bebes"))]);
        write_dataset(&first, &root, &WriteOptions::default()).unwrap();

        // One product split across two categories: more groups than
        // distinct products, so the raised ceiling still refuses.
        let second = sales_table(vec![
            ("o2", 1.0, "p9", Some("a")),
            ("o3", 2.0, "p9", Some("b")),
        ]);
        let options = WriteOptions {
            partition_ceiling_override: Some(1),
            ..WriteOptions::default()
        };
        let err = write_dataset(&second, &root, &options).unwrap_err();
        assert!(matches!(err, EtlError::Write { .. }));
        assert!(root.join("product_category_name=bebes").exists());
    }

    #[test]
    fn test_uncapped_engine_ignores_the_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("sales");
        let table = sales_table(vec![
            ("o2", 1.0, "p9", Some("a")),
            ("o3", 2.0, "p9", Some("b")),
        ]);
        let options = WriteOptions {
            engine: Engine::Uncapped,
            partition_ceiling_override: Some(1),
            ..WriteOptions::default()
        };

        let summary = write_dataset(&table, &root, &options).unwrap();
        assert_eq!(summary.partitions_written, 2);
        assert_eq!(summary.effective_ceiling, None);
    }

    #[test]
    fn test_beyond_default_ceiling_still_writes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("sales");
        let mut table = Table::new(
            ["order_id", "price", "product_id", "product_category_name"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        );
        let wide = DEFAULT_PARTITION_CEILING + 6;
        for n in 0..wide {
            table
                .push_row(vec![
                    s(&format!("o{n}")),
                    Value::Float(1.0),
                    s(&format!("p{n}")),
                    s("telefonia"),
                ])
                .unwrap();
        }

        let summary = write_dataset(&table, &root, &WriteOptions::default()).unwrap();
        assert_eq!(summary.partitions_written, wide);
        assert_eq!(summary.effective_ceiling, Some(wide));
    }

    #[test]
    fn test_empty_table_writes_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("sales");
        let table = sales_table(vec![]);

        let summary = write_dataset(&table, &root, &WriteOptions::default()).unwrap();
        assert_eq!(summary.partitions_written, 0);
        assert!(root.is_dir());
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_partition_column_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let table = Table::new(vec!["order_id".to_string()]);
        let err = write_dataset(&table, dir.path(), &WriteOptions::default()).unwrap_err();
        assert!(matches!(err, EtlError::Schema { .. }));
    }
}
