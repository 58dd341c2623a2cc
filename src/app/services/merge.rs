//! Row merge engine
//!
//! Merges the single matched reference row into an output row. Each
//! reference column present in the output is handled according to its
//! output action; the original input values can be preserved in a
//! provenance column and a transcriber note can be appended. Every cell that
//! changes gets an edit marker.

use crate::app::models::{EditMarker, OutputRow, Row};
use crate::app::services::reference_table::{CommandNames, OutputAction, ReferenceTable};
use crate::{Error, Result};
use std::collections::HashSet;
use tracing::trace;

/// Immutable merge configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    /// Output command tokens of the reference rule row
    pub commands: CommandNames,

    /// Reference value meaning "keep the output cell as it is", lowercased
    pub keep_marker: String,

    /// Separator placed between appended values
    pub separator: String,

    /// Column collecting the original input values of merged columns
    pub provenance_column: Option<String>,

    /// Label written before the collected original values
    pub provenance_header: String,

    /// Column receiving the transcriber note
    pub note_column: Option<String>,

    /// Transcriber note text, placeholders already expanded
    pub note_text: String,
}

impl MergeOptions {
    pub fn new(commands: CommandNames, keep_marker: &str, separator: impl Into<String>) -> Self {
        Self {
            commands,
            keep_marker: keep_marker.trim().to_lowercase(),
            separator: separator.into(),
            provenance_column: None,
            provenance_header: String::new(),
            note_column: None,
            note_text: String::new(),
        }
    }

    pub fn with_provenance(mut self, column: impl Into<String>, header: impl Into<String>) -> Self {
        self.provenance_column = Some(column.into());
        self.provenance_header = header.into();
        self
    }

    pub fn with_note(mut self, column: impl Into<String>, text: impl Into<String>) -> Self {
        self.note_column = Some(column.into());
        self.note_text = text.into();
        self
    }

    /// The note column, if a note is configured and non-empty
    pub fn active_note_column(&self) -> Option<&str> {
        self.note_column
            .as_deref()
            .filter(|_| !self.note_text.is_empty())
    }

    fn is_keep_marker(&self, value: &str) -> bool {
        value.trim().to_lowercase() == self.keep_marker
    }

    fn is_provenance_column(&self, name: &str) -> bool {
        self.provenance_column
            .as_deref()
            .is_some_and(|target| target.trim().eq_ignore_ascii_case(name.trim()))
    }
}

/// Join two strings with a separator, dropping the separator when the first is empty
pub fn join_nonempty(existing: &str, value: &str, separator: &str) -> String {
    if existing.is_empty() {
        value.to_string()
    } else {
        format!("{existing}{separator}{value}")
    }
}

/// Merge reference row `matched_row` of `table` into `output`.
///
/// `input` is the unmodified input row, used for provenance values.
///
/// # Errors
/// * `Error::Merge` if the matched row does not exist or a configured
///   provenance or note column is missing from the output row
pub fn merge(
    input: &Row,
    mut output: OutputRow,
    table: &ReferenceTable,
    matched_row: usize,
    options: &MergeOptions,
) -> Result<OutputRow> {
    let reference = table.get_row_as_map(matched_row).ok_or_else(|| {
        Error::merge(format!(
            "Reference row {} does not exist in {}",
            matched_row,
            table.name()
        ))
    })?;

    let mut provenance = Vec::new();
    let mut seen = HashSet::new();

    for (name, value) in reference.iter() {
        if !seen.insert(name.trim().to_lowercase()) || !output.contains(name) {
            continue;
        }
        if options.is_keep_marker(value) {
            trace!("Keeping original data in column {}", name);
            continue;
        }

        if options.provenance_column.is_some() && !options.is_provenance_column(name) {
            if let Some(original) = input.get(name).filter(|v| !v.is_empty()) {
                provenance.push(original.to_string());
            }
        }

        let current = output.get(name).unwrap_or_default().to_string();
        match table.output_action_for_column(name, &options.commands) {
            OutputAction::Replace => {
                output.set(name, value, EditMarker::Replaced);
            }
            OutputAction::FillIfEmpty if current.trim().is_empty() => {
                output.set(name, value, EditMarker::Replaced);
            }
            OutputAction::Append if !value.is_empty() => {
                let joined = join_nonempty(&current, value, &options.separator);
                output.set(name, joined, EditMarker::Appended);
            }
            _ => {}
        }
    }

    if let Some(target) = options.provenance_column.as_deref() {
        let original = format!(
            "\n{} {}",
            options.provenance_header,
            provenance.join(&options.separator)
        );
        append_to(&mut output, target, &original, "")?;
    }

    if let Some(target) = options.active_note_column() {
        append_to(&mut output, target, &options.note_text, &options.separator)?;
    }

    Ok(output)
}

fn append_to(output: &mut OutputRow, column: &str, text: &str, separator: &str) -> Result<()> {
    let existing = output
        .get(column)
        .ok_or_else(|| Error::merge(format!("Output column {} does not exist", column)))?;
    let joined = join_nonempty(existing, text, separator);
    output.set(column, joined, EditMarker::Appended);
    Ok(())
}
