//! Match finding against a reference table

use super::ReferenceTable;
use crate::Result;
use crate::app::models::Row;
use crate::app::services::rules::{MatchCode, RowTest};
use crate::app::services::text_normalizer::TextNormalizer;
use std::fmt;
use tracing::trace;

/// A matching reference row: the table it belongs to and its 1-based row number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MatchLocation {
    pub table: usize,
    pub row: usize,
}

impl fmt::Display for MatchLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table + 1, self.row)
    }
}

impl ReferenceTable {
    /// Find the reference rows matching an input row.
    ///
    /// The input row is normalized once, then every data row is tested with
    /// `rules` in order. The first failing rule ends the tests for that row.
    /// A row matches when no rule failed and at least one rule made a real
    /// test, so a row of wildcards never matches.
    ///
    /// Returns 1-based row numbers in table order.
    ///
    /// # Errors
    /// * `Error::DateFormat` from a date rule; the whole search is abandoned
    pub fn find_matches<T: RowTest>(
        &self,
        input: &Row,
        rules: &[T],
        normalizer: &TextNormalizer,
    ) -> Result<Vec<usize>> {
        let normalized = normalizer.normalize_row(input);
        let mut matches = Vec::new();

        for row in self.data_rows() {
            let mut successes = 0;
            let mut all_passed = true;

            for rule in rules {
                let code = rule.evaluate(&normalized, self.getvalue(row, rule.column_index()))?;
                successes += code.code();
                if code == MatchCode::Failure {
                    all_passed = false;
                    break;
                }
            }

            if all_passed && successes > 0 {
                trace!("Reference row {} of {} matches", row, self.name());
                matches.push(row);
            }
        }

        Ok(matches)
    }

    /// [`find_matches`](Self::find_matches) with the table's own rule set
    pub fn find_matches_with_rules(&self, input: &Row, normalizer: &TextNormalizer) -> Result<Vec<usize>> {
        self.find_matches(input, &self.rules, normalizer)
    }
}

/// Collect the matches of an input row across several reference tables
///
/// # Errors
/// * `Error::DateFormat` from any table; no partial result is returned
pub fn find_matches_in_tables(
    tables: &[ReferenceTable],
    input: &Row,
    normalizer: &TextNormalizer,
) -> Result<Vec<MatchLocation>> {
    let mut locations = Vec::new();
    for (index, table) in tables.iter().enumerate() {
        locations.extend(
            table
                .find_matches_with_rules(input, normalizer)?
                .into_iter()
                .map(|row| MatchLocation { table: index, row }),
        );
    }
    Ok(locations)
}
