//! Tabular source and sink interfaces
//!
//! The matching engine only sees tables through these traits. Row numbers
//! are 1-based like spreadsheet rows (row 1 holds the column names); column
//! indices are 0-based.

use crate::app::models::{EditMarker, OutputRow, Row};
use crate::{Error, Result};

/// Read access to a table of string cells
pub trait TabularSource {
    /// File or table name, for messages
    fn name(&self) -> &str;

    /// Column names from row 1
    fn column_names(&self) -> &[String];

    /// Number of rows, including the header row
    fn row_count(&self) -> usize;

    /// Cell values of a row (1-based), padded to the column count
    fn get_row(&self, row: usize) -> Option<&[String]>;

    /// A row as a column name → value mapping
    fn get_row_as_map(&self, row: usize) -> Option<Row> {
        self.get_row(row)
            .map(|values| Row::from_columns(self.column_names(), values))
    }

    /// Whether a column exists
    fn has_column(&self, name: &str, case_sensitive: bool) -> bool {
        let name = name.trim();
        if case_sensitive {
            self.column_names().iter().any(|n| n == name)
        } else {
            self.column_number(name).is_some()
        }
    }

    /// 0-based index of the first column with this name (case-insensitive)
    fn column_number(&self, name: &str) -> Option<usize> {
        let name = name.trim().to_lowercase();
        self.column_names()
            .iter()
            .position(|n| n.to_lowercase() == name)
    }

    /// A single cell value
    fn get_value(&self, row: usize, column: usize) -> Option<&str> {
        self.get_row(row)
            .and_then(|values| values.get(column))
            .map(String::as_str)
    }
}

/// Forward cursor over the rows of a source
#[derive(Debug)]
pub struct SourceCursor<'a, S: TabularSource + ?Sized> {
    source: &'a S,
    row: usize,
}

impl<'a, S: TabularSource + ?Sized> SourceCursor<'a, S> {
    /// Cursor positioned at `start_row` (1-based)
    pub fn new(source: &'a S, start_row: usize) -> Self {
        Self {
            source,
            row: start_row.max(1),
        }
    }

    /// Current row number
    pub fn row_number(&self) -> usize {
        self.row
    }

    /// Current row as a mapping, `None` past the end
    pub fn current(&self) -> Option<Row> {
        self.source.get_row_as_map(self.row)
    }

    pub fn advance(&mut self) {
        self.row += 1;
    }

    pub fn at_end(&self) -> bool {
        self.row > self.source.row_count()
    }
}

/// Write access for output tables
///
/// All columns are added before the first row is written.
pub trait TabularSink {
    /// Output column names in order
    fn column_names(&self) -> &[String];

    /// Whether an output column exists (case-insensitive)
    fn has_column(&self, name: &str) -> bool {
        let name = name.trim().to_lowercase();
        self.column_names().iter().any(|n| n.to_lowercase() == name)
    }

    /// Insert a column at a 1-based position. `header_labels[0]` is the
    /// column name; further labels fill the column in the rows written next
    /// while those rows have no value of their own.
    ///
    /// # Errors
    /// * `Error::DuplicateColumn` if the name is empty or already present
    /// * `Error::ColumnsFrozen` once a row has been written
    fn add_column(&mut self, position: usize, header_labels: &[&str]) -> Result<()>;

    /// Write one output row together with its edit map
    fn write_row(&mut self, row: &OutputRow) -> Result<()>;

    /// Flush and close the output
    fn finish(&mut self) -> Result<()>;
}

/// Column order and header labels shared by the sink implementations
#[derive(Debug, Clone, Default)]
pub struct ColumnLayout {
    names: Vec<String>,
    extra_labels: Vec<Vec<String>>,
}

impl ColumnLayout {
    pub fn new(names: &[String]) -> Self {
        Self {
            names: names.iter().map(|n| n.trim().to_string()).collect(),
            extra_labels: vec![Vec::new(); names.len()],
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        let name = name.trim().to_lowercase();
        self.names.iter().any(|n| n.to_lowercase() == name)
    }

    /// Insert a column at a 1-based position, clamped to the table width
    pub fn add_column(&mut self, position: usize, header_labels: &[&str]) -> Result<()> {
        let name = header_labels.first().map(|n| n.trim()).unwrap_or_default();
        if name.is_empty() || self.contains(name) {
            return Err(Error::duplicate_column(name));
        }
        let index = position.saturating_sub(1).min(self.names.len());
        self.names.insert(index, name.to_string());
        self.extra_labels.insert(
            index,
            header_labels[1..].iter().map(|l| l.to_string()).collect(),
        );
        Ok(())
    }

    /// Lay out an output row in column order.
    ///
    /// `rows_written` is the number of rows already written, used to place
    /// extra header labels.
    pub fn arrange(&self, row: &OutputRow, rows_written: usize) -> (Vec<String>, Vec<EditMarker>) {
        let (mut values, edits): (Vec<String>, Vec<EditMarker>) =
            if row.row().names() == self.names.as_slice() {
                (row.row().values().to_vec(), row.edits().to_vec())
            } else {
                self.names
                    .iter()
                    .map(|name| {
                        (
                            row.get(name).unwrap_or_default().to_string(),
                            row.edit(name).unwrap_or_default(),
                        )
                    })
                    .unzip()
            };

        for (value, labels) in values.iter_mut().zip(&self.extra_labels) {
            if value.is_empty() {
                if let Some(label) = labels.get(rows_written) {
                    *value = label.clone();
                }
            }
        }

        (values, edits)
    }
}
