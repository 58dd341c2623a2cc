//! Data models for georeferencing
//!
//! This module contains the row representations that flow between the
//! tabular adapters and the matching and merge services: an input [`Row`]
//! keyed by column name, and an [`OutputRow`] carrying a parallel edit map.

// =============================================================================
// Rows
// =============================================================================

/// A table row as an ordered column name → value mapping
///
/// Column names keep their original case, but every lookup is
/// case-insensitive. When a name occurs more than once the first occurrence
/// wins for lookups and updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    names: Vec<String>,
    values: Vec<String>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from column names and cell values.
    ///
    /// Missing trailing values become empty strings; surplus values are dropped.
    pub fn from_columns(names: &[String], values: &[String]) -> Self {
        let values = (0..names.len())
            .map(|i| values.get(i).cloned().unwrap_or_default())
            .collect();
        Self {
            names: names.to_vec(),
            values,
        }
    }

    /// Build a row from (name, value) pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut row = Self::new();
        for (name, value) in pairs {
            row.push(name, value);
        }
        row
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Column names in order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Cell values in column order
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Iterate over (name, value) pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names
            .iter()
            .zip(self.values.iter())
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Position of the first column with this name (case-insensitive)
    pub fn position(&self, name: &str) -> Option<usize> {
        let name = name.trim().to_lowercase();
        self.names.iter().position(|n| n.to_lowercase() == name)
    }

    /// Whether the row has a column with this name (case-insensitive)
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Value of the named column, `None` if the column does not exist
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.values[i].as_str())
    }

    /// Value of the named column, empty string if the column does not exist
    pub fn value_or_empty(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    /// Replace the value of an existing column. Returns false if the column is missing.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.position(name) {
            Some(i) => {
                self.values[i] = value.into();
                true
            }
            None => false,
        }
    }

    /// Append a column at the end, without checking for duplicates
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.names.push(name.into());
        self.values.push(value.into());
    }

    /// Return a copy of this row with every value passed through `f`
    pub fn map_values<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&str) -> String,
    {
        Self {
            names: self.names.clone(),
            values: self.values.iter().map(|v| f(v)).collect(),
        }
    }

    /// Whether the named column exists and holds non-whitespace content
    pub fn has_content(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.trim().is_empty())
    }
}

// =============================================================================
// Output Rows and Edit Tracking
// =============================================================================

/// How a cell was modified during merge, used for downstream highlighting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EditMarker {
    /// Cell left as it was
    #[default]
    Unchanged,
    /// Cell overwritten with a reference value
    Replaced,
    /// Reference value or note appended to the cell
    Appended,
}

impl EditMarker {
    pub fn is_edited(self) -> bool {
        !matches!(self, EditMarker::Unchanged)
    }
}

/// Mutable output row with a parallel edit map
///
/// Every column of the row has exactly one edit marker; the two can only be
/// changed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    row: Row,
    edits: Vec<EditMarker>,
}

impl OutputRow {
    /// Copy an input row unchanged, with no edits
    pub fn from_input(input: &Row) -> Self {
        Self {
            row: input.clone(),
            edits: vec![EditMarker::Unchanged; input.len()],
        }
    }

    /// Copy an input row into the given output schema.
    ///
    /// Columns absent from the input start empty. A repeated column name
    /// takes the value of the same repeat in the input.
    pub fn with_columns(input: &Row, columns: &[String]) -> Self {
        let lowered: Vec<String> = input.names.iter().map(|n| n.trim().to_lowercase()).collect();
        let values: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let key = column.trim().to_lowercase();
                let repeat = columns[..i]
                    .iter()
                    .filter(|c| c.trim().to_lowercase() == key)
                    .count();
                lowered
                    .iter()
                    .enumerate()
                    .filter(|(_, n)| **n == key)
                    .nth(repeat)
                    .map(|(j, _)| input.values[j].clone())
                    .unwrap_or_default()
            })
            .collect();
        Self {
            row: Row::from_columns(columns, &values),
            edits: vec![EditMarker::Unchanged; columns.len()],
        }
    }

    /// The row values
    pub fn row(&self) -> &Row {
        &self.row
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.row.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.row.contains(name)
    }

    /// Set a cell and record how it was edited. Returns false if the column is missing.
    pub fn set(&mut self, name: &str, value: impl Into<String>, marker: EditMarker) -> bool {
        match self.row.position(name) {
            Some(i) => {
                self.row.values[i] = value.into();
                self.edits[i] = marker;
                true
            }
            None => false,
        }
    }

    /// Edit marker of the named column
    pub fn edit(&self, name: &str) -> Option<EditMarker> {
        self.row.position(name).map(|i| self.edits[i])
    }

    /// Edit markers in column order
    pub fn edits(&self) -> &[EditMarker] {
        &self.edits
    }

    /// Whether any cell was edited
    pub fn is_edited(&self) -> bool {
        self.edits.iter().any(|e| e.is_edited())
    }
}
