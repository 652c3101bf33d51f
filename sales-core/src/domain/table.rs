use std::collections::HashMap;

use crate::common::error::{EtlError, Result};

use super::Value;

/// Column-addressed, row-major table: the unit every pipeline step consumes
/// and produces. Columns keep their declared order; lookups go through the
/// name index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Creates an empty table with the given column names. Callers building
    /// tables from untrusted headers must reject duplicates first; for
    /// duplicate names the index keeps the last occurrence.
    pub fn new(columns: Vec<String>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(position, name)| (name.clone(), position))
            .collect();
        Self {
            columns,
            index,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Column position, or a schema error naming the table it was expected in.
    pub fn require_column(&self, table_name: &str, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| EtlError::Schema {
            table: table_name.to_string(),
            column: name.to_string(),
        })
    }

    /// Appends a row, enforcing header arity.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(EtlError::Parse(format!(
                "row has {} values but the table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Pure column projection in the requested order. No row filtering.
    pub fn project(&self, table_name: &str, wanted: &[&str]) -> Result<Table> {
        let positions = wanted
            .iter()
            .map(|name| self.require_column(table_name, name))
            .collect::<Result<Vec<_>>>()?;

        let mut projected = Table::new(wanted.iter().map(|name| name.to_string()).collect());
        for row in &self.rows {
            projected
                .rows
                .push(positions.iter().map(|&i| row[i].clone()).collect());
        }
        Ok(projected)
    }

    /// Distinct non-null values in a column, by canonical form.
    pub fn distinct_count(&self, table_name: &str, column: &str) -> Result<usize> {
        let position = self.require_column(table_name, column)?;
        let mut seen = std::collections::HashSet::new();
        for row in &self.rows {
            if let Some(key) = row[position].canonical() {
                seen.insert(key);
            }
        }
        Ok(seen.len())
    }
}
