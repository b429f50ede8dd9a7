//! Tabular data model and per-run consolidation.
//!
//! One [`Table`] is the parsed result of a single document's model
//! response. [`ConsolidatedTable`] is the row-wise union of every parsed
//! table in a run.
//!
//! ## Why reindex by column name?
//!
//! Concatenating tables positionally silently misaligns columns the moment
//! one response orders its header differently. Instead each row is mapped
//! into the consolidated header by column *name*: columns unknown so far
//! are appended (first-seen order), and cells a table does not provide are
//! filled with the placeholder. The result is associative — absorbing
//! tables one at a time yields the same rows as consolidating them all at
//! once — and never mixes values across differently-named columns.

use serde::{Deserialize, Serialize};

/// A parsed markdown table: one header row plus zero or more data rows.
///
/// Rows are stored exactly as wide as the header; the parser pads or
/// truncates ragged rows before constructing a `Table`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Remove duplicate columns by name, keeping the leftmost occurrence
    /// of each. Idempotent.
    pub fn dedup_columns(&self) -> Table {
        let mut seen = Vec::with_capacity(self.header.len());
        let mut keep = Vec::with_capacity(self.header.len());

        for (i, name) in self.header.iter().enumerate() {
            if !seen.contains(name) {
                seen.push(name.clone());
                keep.push(i);
            }
        }

        let rows = self
            .rows
            .iter()
            .map(|row| {
                keep.iter()
                    .map(|&i| row.get(i).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();

        Table { header: seen, rows }
    }
}

/// The union of all per-document tables for one run.
///
/// Invariant: no two columns share a name, and every row is exactly
/// `header.len()` cells wide with no empty cells (missing values carry the
/// placeholder marker instead).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ConsolidatedTable {
    /// An empty table with no columns and no rows.
    pub fn empty() -> Self {
        Self {
            header: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Merge one document's table into the consolidated result.
    ///
    /// The incoming table's columns are deduplicated, previously unseen
    /// column names are appended to the header (padding existing rows with
    /// the placeholder), and each incoming row is reindexed by column name.
    /// Rows consisting entirely of empty/placeholder cells are dropped.
    pub fn absorb(&mut self, table: &Table, placeholder: &str) {
        let table = table.dedup_columns();

        for name in &table.header {
            if !self.header.contains(name) {
                self.header.push(name.clone());
                for row in &mut self.rows {
                    row.push(placeholder.to_string());
                }
            }
        }

        for row in &table.rows {
            let mut out = vec![placeholder.to_string(); self.header.len()];
            for (name, cell) in table.header.iter().zip(row) {
                let cell = cell.trim();
                if !cell.is_empty() {
                    // Header names are unique after dedup, so position lookup
                    // cannot collide.
                    let pos = self
                        .header
                        .iter()
                        .position(|h| h == name)
                        .expect("absorbed column must exist in header");
                    out[pos] = cell.to_string();
                }
            }

            if out.iter().any(|cell| cell != placeholder) {
                self.rows.push(out);
            }
        }
    }
}

/// Consolidate every parsed table into one. Returns an empty table when
/// `tables` is empty (the caller maps that to the no-result outcome).
pub fn consolidate<'a, I>(tables: I, placeholder: &str) -> ConsolidatedTable
where
    I: IntoIterator<Item = &'a Table>,
{
    let mut combined = ConsolidatedTable::empty();
    for table in tables {
        combined.absorb(table, placeholder);
    }
    combined
}
