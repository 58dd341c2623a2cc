//! In-memory tables
//!
//! [`MemoryTable`] is the loaded form of every source: delimited files and
//! worksheets are read into it whole. [`MemorySink`] collects output rows,
//! mainly for tests and dry runs.

use super::tabular::{ColumnLayout, TabularSink, TabularSource};
use crate::Result;
use crate::app::models::{EditMarker, OutputRow};
use tracing::debug;

/// A fully loaded table of string cells; row 0 of `rows` is the header row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryTable {
    name: String,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl MemoryTable {
    /// Build a table from raw rows (the first row is the header).
    ///
    /// Rows are padded to the widest row and header names are trimmed.
    pub fn new(name: impl Into<String>, raw_rows: Vec<Vec<String>>) -> Self {
        let width = raw_rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut rows: Vec<Vec<String>> = raw_rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        if let Some(header) = rows.first_mut() {
            for name in header.iter_mut() {
                *name = name.trim().to_string();
            }
        }
        let header = rows.first().cloned().unwrap_or_default();

        Self {
            name: name.into(),
            header,
            rows,
        }
    }

    /// Convenience constructor from string slices
    pub fn from_rows(name: impl Into<String>, rows: &[&[&str]]) -> Self {
        Self::new(
            name,
            rows.iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    /// Drop columns whose cells are all empty, header included
    pub fn without_empty_columns(self) -> Self {
        let width = self.header.len();
        let keep: Vec<bool> = (0..width)
            .map(|col| self.rows.iter().any(|row| !row[col].trim().is_empty()))
            .collect();
        let dropped = keep.iter().filter(|k| !**k).count();
        if dropped == 0 {
            return self;
        }
        debug!("Dropping {} empty columns from {}", dropped, self.name);

        let rows: Vec<Vec<String>> = self
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(&keep)
                    .filter_map(|(cell, k)| k.then_some(cell))
                    .collect()
            })
            .collect();
        Self::new(self.name, rows)
    }

    /// 1-based position of the first empty header cell, if any
    pub fn first_empty_header(&self) -> Option<usize> {
        self.header
            .iter()
            .position(|n| n.is_empty())
            .map(|i| i + 1)
    }
}

impl TabularSource for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn column_names(&self) -> &[String] {
        &self.header
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn get_row(&self, row: usize) -> Option<&[String]> {
        row.checked_sub(1)
            .and_then(|i| self.rows.get(i))
            .map(Vec::as_slice)
    }
}

/// Sink collecting output rows in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    layout: ColumnLayout,
    rows: Vec<(Vec<String>, Vec<EditMarker>)>,
    finished: bool,
}

impl MemorySink {
    /// Sink whose initial columns are `columns`
    pub fn new(columns: &[String]) -> Self {
        Self {
            layout: ColumnLayout::new(columns),
            rows: Vec::new(),
            finished: false,
        }
    }

    /// Written rows with their edit maps, in write order
    pub fn rows(&self) -> &[(Vec<String>, Vec<EditMarker>)] {
        &self.rows
    }

    /// Value of a column in a written row (0-based write index)
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row).map(|(values, _)| values[index].as_str())
    }

    /// Edit marker of a column in a written row (0-based write index)
    pub fn edit(&self, row: usize, column: &str) -> Option<EditMarker> {
        let index = self.column_index(column)?;
        self.rows.get(row).map(|(_, edits)| edits[index])
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        let column = column.to_lowercase();
        self.layout
            .names()
            .iter()
            .position(|n| n.to_lowercase() == column)
    }
}

impl TabularSink for MemorySink {
    fn column_names(&self) -> &[String] {
        self.layout.names()
    }

    fn add_column(&mut self, position: usize, header_labels: &[&str]) -> Result<()> {
        self.layout.add_column(position, header_labels)
    }

    fn write_row(&mut self, row: &OutputRow) -> Result<()> {
        let arranged = self.layout.arrange(row, self.rows.len());
        self.rows.push(arranged);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::Row;

    fn table() -> MemoryTable {
        MemoryTable::from_rows(
            "sample",
            &[
                &[" Locality ", "", "County"],
                &["Helsinki", "", "Uusimaa"],
                &["Turku"],
            ],
        )
    }

    #[test]
    fn test_rows_are_padded_and_header_trimmed() {
        let t = table();
        assert_eq!(t.column_names(), &["Locality", "", "County"]);
        assert_eq!(t.row_count(), 3);
        assert_eq!(t.get_row(3).unwrap(), &["Turku", "", ""]);
        assert_eq!(t.get_row(0), None);
        assert_eq!(t.get_row(4), None);
        assert_eq!(t.first_empty_header(), Some(2));
    }

    #[test]
    fn test_empty_columns_are_dropped() {
        let t = table().without_empty_columns();
        assert_eq!(t.column_names(), &["Locality", "County"]);
        assert_eq!(t.get_value(2, 1), Some("Uusimaa"));
        assert_eq!(t.first_empty_header(), None);
    }

    #[test]
    fn test_source_lookups() {
        let t = table();
        assert!(t.has_column("county", false));
        assert!(!t.has_column("county", true));
        assert_eq!(t.column_number("COUNTY"), Some(2));
        let row = t.get_row_as_map(2).unwrap();
        assert_eq!(row.get("locality"), Some("Helsinki"));
    }

    #[test]
    fn test_memory_sink_collects_rows() {
        let mut sink = MemorySink::new(&["locality".to_string()]);
        sink.add_column(2, &["county"]).unwrap();

        let mut out = OutputRow::with_columns(
            &Row::from_pairs([("locality", "Helsinki")]),
            sink.column_names(),
        );
        out.set("county", "Uusimaa", EditMarker::Replaced);
        sink.write_row(&out).unwrap();
        sink.finish().unwrap();

        assert_eq!(sink.value(0, "County"), Some("Uusimaa"));
        assert_eq!(sink.edit(0, "county"), Some(EditMarker::Replaced));
        assert_eq!(sink.edit(0, "locality"), Some(EditMarker::Unchanged));
        assert!(sink.is_finished());
    }
}
