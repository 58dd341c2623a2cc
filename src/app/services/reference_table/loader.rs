//! Reference table loading and validation

use super::ReferenceTable;
use crate::app::adapters::files::read_table;
use crate::app::adapters::memory_table::MemoryTable;
use crate::app::adapters::tabular::TabularSource;
use crate::app::services::rules::parse_rules;
use crate::constants::{HEADER_ROW, REFERENCE_MIN_ROWS, RULE_ROW};
use crate::{Error, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

impl ReferenceTable {
    /// Load a reference table from a workbook sheet or a delimited file
    ///
    /// # Errors
    /// * `Error::FileNotFound`, `Error::CsvParsing` or `Error::Spreadsheet`
    ///   from reading the file
    /// * every error of [`ReferenceTable::from_source`]
    pub fn load(
        path: &Path,
        sheet: Option<&str>,
        delimiter: u8,
        first_data_row: usize,
        accepted_rule_types: &[&str],
    ) -> Result<Self> {
        info!("Loading reference data from file {}", path.display());
        let table = read_table(path, sheet, delimiter)?;
        Self::from_table(table, first_data_row, accepted_rule_types)
    }

    /// Build a reference table from any tabular source
    ///
    /// # Errors
    /// * `Error::TableTooShort` with fewer than three rows
    /// * `Error::EmptyHeader` if a column has no name
    /// * `Error::UnknownRuleType` from rule parsing
    /// * `Error::Configuration` if `first_data_row` points into the rule rows
    pub fn from_source<S: TabularSource + ?Sized>(
        source: &S,
        first_data_row: usize,
        accepted_rule_types: &[&str],
    ) -> Result<Self> {
        let rows = (1..=source.row_count())
            .filter_map(|row| source.get_row(row).map(<[String]>::to_vec))
            .collect();
        Self::from_table(
            MemoryTable::new(source.name(), rows),
            first_data_row,
            accepted_rule_types,
        )
    }

    fn from_table(
        table: MemoryTable,
        first_data_row: usize,
        accepted_rule_types: &[&str],
    ) -> Result<Self> {
        if table.row_count() < REFERENCE_MIN_ROWS {
            return Err(Error::table_too_short(
                table.name(),
                table.row_count(),
                REFERENCE_MIN_ROWS,
            ));
        }
        if first_data_row <= RULE_ROW {
            return Err(Error::configuration(format!(
                "First data line of reference file {} must be after row {}, got {}",
                table.name(),
                RULE_ROW,
                first_data_row
            )));
        }
        if let Some(column) = table.first_empty_header() {
            return Err(Error::empty_header(table.name(), column));
        }

        let lower_names: Vec<String> = table
            .column_names()
            .iter()
            .map(|n| n.to_lowercase())
            .collect();
        warn_duplicate_names(table.name(), &lower_names);

        let rule_row: Vec<String> = table
            .get_row(RULE_ROW)
            .unwrap_or_default()
            .iter()
            .map(|t| t.trim().to_string())
            .collect();

        debug!("Parsing rules from reference file headers");
        let rules = parse_rules(table.column_names(), &rule_row, accepted_rule_types)?;

        debug!(
            "Reference table {}: {} columns, {} rows (header row {}, data from row {})",
            table.name(),
            table.column_names().len(),
            table.row_count(),
            HEADER_ROW,
            first_data_row
        );

        Ok(Self {
            table,
            lower_names,
            rule_row,
            rules,
            first_data_row,
        })
    }
}

fn warn_duplicate_names(file: &str, lower_names: &[String]) {
    let mut seen = HashSet::new();
    for (index, name) in lower_names.iter().enumerate() {
        if !seen.insert(name.as_str()) {
            warn!(
                "File {}, column {}: duplicate column name '{}', the first occurrence is used",
                file,
                index + 1,
                name
            );
        }
    }
}
