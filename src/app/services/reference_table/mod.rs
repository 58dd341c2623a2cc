//! Known-data reference table
//!
//! A reference table (gazetteer) is a spreadsheet-like table whose first
//! rows describe how it is used:
//!
//! - row 1: column names
//! - row 2: per column, either a matching rule token (`equal`, `datebefore`,
//!   ...) or an output command token (replace, append, ...)
//! - row 3: free description row
//! - data rows from `first_data_row` (default 4)
//!
//! The table is loaded once and then only read: match finding and merging
//! never mutate it.

use crate::app::adapters::memory_table::MemoryTable;
use crate::app::adapters::tabular::TabularSource;
use crate::app::models::Row;
use crate::app::services::rules::Rule;

pub mod actions;
pub mod loader;
pub mod matching;

#[cfg(test)]
pub mod tests;

pub use actions::{CommandNames, OutputAction};
pub use matching::MatchLocation;

/// A loaded reference table with its parsed rule set
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    /// Raw cells, header row included
    pub(crate) table: MemoryTable,

    /// Lowercased column names for case-insensitive lookups
    pub(crate) lower_names: Vec<String>,

    /// Trimmed rule row tokens, one per column
    pub(crate) rule_row: Vec<String>,

    /// Matching rules in column order
    pub(crate) rules: Vec<Rule>,

    /// First row holding reference data (1-based)
    pub(crate) first_data_row: usize,
}

impl ReferenceTable {
    /// Table name (usually the file path)
    pub fn name(&self) -> &str {
        self.table.name()
    }

    /// Column names in their original case
    pub fn column_names(&self) -> &[String] {
        self.table.column_names()
    }

    /// Rule row tokens, trimmed, one per column
    pub fn rule_row(&self) -> &[String] {
        &self.rule_row
    }

    /// Parsed matching rules in evaluation order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn first_data_row(&self) -> usize {
        self.first_data_row
    }

    /// Number of rows including the header rows
    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    /// Number of reference data rows
    pub fn data_row_count(&self) -> usize {
        (self.row_count() + 1).saturating_sub(self.first_data_row)
    }

    /// Rows that hold reference data, in table order
    pub fn data_rows(&self) -> std::ops::RangeInclusive<usize> {
        self.first_data_row..=self.row_count()
    }

    /// Cell value, empty string outside the table
    pub fn getvalue(&self, row: usize, column: usize) -> &str {
        self.table.get_value(row, column).unwrap_or("")
    }

    /// 0-based index of the first column with this name (case-insensitive)
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim().to_lowercase();
        self.lower_names.iter().position(|n| *n == name)
    }

    /// A row as a column name → value mapping
    pub fn get_row_as_map(&self, row: usize) -> Option<Row> {
        self.table.get_row_as_map(row)
    }

    /// Resolve the output action of a column.
    ///
    /// Duplicate names resolve to the first column with that name, the same
    /// column the merge takes its value from. A token that is not a command
    /// name gives [`OutputAction::Ignore`].
    pub fn output_action_for_column(&self, name: &str, commands: &CommandNames) -> OutputAction {
        self.column_index(name)
            .and_then(|index| self.rule_row.get(index))
            .and_then(|token| commands.action_for(token))
            .unwrap_or(OutputAction::Ignore)
    }

    /// Columns whose rule row token is an active output command
    /// (replace, append, fill-empty), in column order
    pub fn output_column_names(&self, commands: &CommandNames) -> Vec<&str> {
        self.column_names()
            .iter()
            .zip(&self.rule_row)
            .filter(|(_, token)| commands.is_active(token))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
