//! Per-row georeferencing state machine and file driver
//!
//! Every input data row goes through the same steps: skip check, match
//! finding across all reference tables, and a merge when exactly one
//! reference row matched. The result is a [`RowOutcome`] and an output row
//! that is always written, in input order, whatever the outcome.

use crate::app::adapters::tabular::{SourceCursor, TabularSink, TabularSource};
use crate::app::models::{OutputRow, Row};
use crate::app::services::merge::merge;
use crate::app::services::reference_table::matching::find_matches_in_tables;
use crate::app::services::reference_table::{MatchLocation, ReferenceTable};
use crate::config::EngineSettings;
use crate::constants::{HEADER_ROW, PROGRESS_LOG_INTERVAL};
use crate::{Error, Result};
use std::fmt;
use tracing::{debug, info, warn};

/// What happened to one input row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// Extra header row before the first data line, copied as is
    HeaderRow,
    /// A skip column already had content
    Skipped,
    /// No reference row matched
    NoMatch,
    /// More than one reference row matched; never resolved automatically
    Ambiguous(Vec<MatchLocation>),
    /// A date could not be parsed, so the row could not be tested
    Unmatchable,
    /// Exactly one reference row matched and was merged
    Merged(MatchLocation),
}

/// Row counts for one processed file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStats {
    pub total_rows: usize,
    pub header_rows: usize,
    pub skipped: usize,
    pub no_match: usize,
    pub ambiguous: usize,
    pub unmatchable: usize,
    pub merged: usize,
}

impl FileStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one row outcome
    pub fn record(&mut self, outcome: &RowOutcome) {
        self.total_rows += 1;
        match outcome {
            RowOutcome::HeaderRow => self.header_rows += 1,
            RowOutcome::Skipped => self.skipped += 1,
            RowOutcome::NoMatch => self.no_match += 1,
            RowOutcome::Ambiguous(_) => self.ambiguous += 1,
            RowOutcome::Unmatchable => self.unmatchable += 1,
            RowOutcome::Merged(_) => self.merged += 1,
        }
    }

    /// Add the counts of another file
    pub fn accumulate(&mut self, other: &FileStats) {
        self.total_rows += other.total_rows;
        self.header_rows += other.header_rows;
        self.skipped += other.skipped;
        self.no_match += other.no_match;
        self.ambiguous += other.ambiguous;
        self.unmatchable += other.unmatchable;
        self.merged += other.merged;
    }

    /// Data rows, extra header rows excluded
    pub fn data_rows(&self) -> usize {
        self.total_rows - self.header_rows
    }

    /// Percentage of data rows that were georeferenced
    pub fn merge_rate(&self) -> f64 {
        if self.data_rows() == 0 {
            0.0
        } else {
            (self.merged as f64 / self.data_rows() as f64) * 100.0
        }
    }
}

impl fmt::Display for FileStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} data rows: {} merged ({:.1}%), {} no match, {} ambiguous, {} skipped, {} unmatchable",
            self.data_rows(),
            self.merged,
            self.merge_rate(),
            self.no_match,
            self.ambiguous,
            self.skipped,
            self.unmatchable
        )
    }
}

/// Row processor bound to the loaded reference tables and engine settings
#[derive(Debug, Clone, Copy)]
pub struct RowProcessor<'a> {
    tables: &'a [ReferenceTable],
    settings: &'a EngineSettings,
}

impl<'a> RowProcessor<'a> {
    pub fn new(tables: &'a [ReferenceTable], settings: &'a EngineSettings) -> Self {
        Self { tables, settings }
    }

    /// Columns the output needs beyond `existing`, in insertion order:
    /// reference output columns, the note column, the provenance column
    pub fn new_columns(&self, existing: &[String]) -> Vec<String> {
        let commands = &self.settings.merge.commands;
        let mut wanted: Vec<&str> = self
            .tables
            .iter()
            .flat_map(|table| table.output_column_names(commands))
            .collect();
        wanted.extend(self.settings.merge.active_note_column());
        wanted.extend(self.settings.merge.provenance_column.as_deref());

        let mut columns: Vec<String> = Vec::new();
        for name in wanted {
            let name = name.trim();
            let present = |n: &String| n.trim().eq_ignore_ascii_case(name);
            if !existing.iter().any(present) && !columns.iter().any(present) {
                columns.push(name.to_string());
            }
        }
        columns
    }

    /// Add the missing output columns to the sink at the configured
    /// position, keeping their order
    ///
    /// # Errors
    /// * `Error::DuplicateColumn` from the sink
    pub fn prepare_output<K: TabularSink + ?Sized>(&self, sink: &mut K) -> Result<Vec<String>> {
        let columns = self.new_columns(sink.column_names());
        for name in columns.iter().rev() {
            info!("Adding column {} to output table", name);
            sink.add_column(self.settings.new_column_position, &[name.as_str()])?;
        }
        Ok(columns)
    }

    /// Run the state machine for one input row
    ///
    /// `columns` is the output schema. Row-level date errors become
    /// [`RowOutcome::Unmatchable`]; every other error is returned.
    pub fn process_row(
        &self,
        row_number: usize,
        input: &Row,
        columns: &[String],
    ) -> Result<(RowOutcome, OutputRow)> {
        let output = OutputRow::with_columns(input, columns);

        if row_number < self.settings.input_first_data_line {
            return Ok((RowOutcome::HeaderRow, output));
        }

        if let Some(column) = self
            .settings
            .skip_if_nonempty
            .iter()
            .find(|c| input.has_content(c))
        {
            debug!("Row {}: column {} has content, skipping", row_number, column);
            return Ok((RowOutcome::Skipped, output));
        }

        let matches = match find_matches_in_tables(self.tables, input, &self.settings.normalizer) {
            Ok(matches) => matches,
            Err(e) if e.is_row_recoverable() => {
                warn!("Row {}: {}. Row not georeferenced", row_number, e);
                return Ok((RowOutcome::Unmatchable, output));
            }
            Err(e) => return Err(e),
        };

        match matches.as_slice() {
            [] => Ok((RowOutcome::NoMatch, output)),
            [location] => {
                let table = &self.tables[location.table];
                debug!(
                    "Row {}: merging reference row {} of {}",
                    row_number,
                    location.row,
                    table.name()
                );
                let merged = merge(input, output, table, location.row, &self.settings.merge)?;
                Ok((RowOutcome::Merged(*location), merged))
            }
            _ => {
                let rows: Vec<String> = matches.iter().map(MatchLocation::to_string).collect();
                info!(
                    "Found multiple matches for input row {}: {}. Check reference data. Skipping row",
                    row_number,
                    rows.join(", ")
                );
                Ok((RowOutcome::Ambiguous(matches), output))
            }
        }
    }

    /// Georeference a whole input table into a sink
    ///
    /// Rows are written in input order. `on_row` is called with each row
    /// number after the row is written.
    ///
    /// # Errors
    /// * `Error::EmptyHeader` if an input column has no name
    /// * `Error::DuplicateColumn` if the output schema cannot be set up
    /// * `Error::Merge` and sink errors, which abort the file
    pub fn process_file<S, K, F>(&self, source: &S, sink: &mut K, mut on_row: F) -> Result<FileStats>
    where
        S: TabularSource + ?Sized,
        K: TabularSink + ?Sized,
        F: FnMut(usize),
    {
        if let Some(index) = source.column_names().iter().position(|n| n.trim().is_empty()) {
            return Err(Error::empty_header(source.name(), index + 1));
        }

        self.prepare_output(sink)?;
        let columns = sink.column_names().to_vec();
        let mut stats = FileStats::new();

        let mut cursor = SourceCursor::new(source, HEADER_ROW + 1);
        while !cursor.at_end() {
            let row_number = cursor.row_number();
            let Some(input) = cursor.current() else {
                break;
            };
            if row_number % PROGRESS_LOG_INTERVAL == 0 {
                debug!("Processing row {}", row_number);
            }

            let (outcome, output) = self.process_row(row_number, &input, &columns)?;
            sink.write_row(&output)?;
            stats.record(&outcome);
            on_row(row_number);
            cursor.advance();
        }

        sink.finish()?;
        info!("{}: {}", source.name(), stats);
        Ok(stats)
    }
}
