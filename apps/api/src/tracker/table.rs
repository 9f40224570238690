//! In-memory image of one tracker sheet: ordered header plus rows keyed by column name.

use std::collections::HashMap;

use serde::Serialize;

/// A single row. Cells for columns the row never had read as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row(HashMap<String, String>);

impl Row {
    pub fn get(&self, column: &str) -> &str {
        self.0.get(column).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.insert(column.into(), value.into());
    }

    fn rename(&mut self, from: &str, to: &str) {
        if let Some(value) = self.0.remove(from) {
            self.0.insert(to.to_string(), value);
        }
    }

    fn remove(&mut self, column: &str) {
        self.0.remove(column);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Row(iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Appends an empty column unless it already exists.
    pub fn add_column(&mut self, column: &str) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
    }

    pub fn rename_column(&mut self, from: &str, to: &str) {
        if let Some(slot) = self.columns.iter_mut().find(|c| *c == from) {
            *slot = to.to_string();
            for row in &mut self.rows {
                row.rename(from, to);
            }
        }
    }

    pub fn drop_column(&mut self, column: &str) {
        self.columns.retain(|c| c != column);
        for row in &mut self.rows {
            row.remove(column);
        }
    }

    /// Replaces the header order. `order` must be a permutation of the current columns.
    pub(crate) fn set_column_order(&mut self, order: Vec<String>) {
        debug_assert_eq!(order.len(), self.columns.len());
        self.columns = order;
    }

    /// Adds a row; columns it introduces are appended to the header in the given order.
    /// Returns the new row's index.
    pub fn append(&mut self, cells: Vec<(String, String)>) -> usize {
        for (column, _) in &cells {
            self.add_column(column);
        }
        self.rows.push(cells.into_iter().collect());
        self.rows.len() - 1
    }

    /// Overwrites the given cells of an existing row. Returns false if the row does not exist.
    pub fn update_in_place(&mut self, index: usize, cells: Vec<(String, String)>) -> bool {
        for (column, _) in &cells {
            self.add_column(column);
        }
        match self.rows.get_mut(index) {
            Some(row) => {
                for (column, value) in cells {
                    row.set(column, value);
                }
                true
            }
            None => false,
        }
    }

    /// Pushes a row as read from storage, without touching the header.
    pub(crate) fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }
}
