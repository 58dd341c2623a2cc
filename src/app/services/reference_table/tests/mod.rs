//! Shared test utilities and fixtures for reference table tests

use crate::app::adapters::memory_table::MemoryTable;
use crate::app::services::reference_table::{CommandNames, ReferenceTable};
use crate::app::services::text_normalizer::TextNormalizer;
use crate::constants::{REFERENCE_FIRST_DATA_ROW, rule_tokens};

pub mod loader_tests;
pub mod matching_tests;

/// Command tokens used by the fixtures
pub fn commands() -> CommandNames {
    CommandNames::new("R", "A", "F", "N")
}

/// Normalizer that only collapses whitespace
pub fn plain_normalizer() -> TextNormalizer {
    TextNormalizer::new("", Vec::<(&str, &str)>::new()).unwrap()
}

/// Build a reference table from header rows and data rows
pub fn reference_table(rows: &[&[&str]]) -> ReferenceTable {
    let table = MemoryTable::from_rows("known.csv", rows);
    ReferenceTable::from_source(&table, REFERENCE_FIRST_DATA_ROW, rule_tokens::KNOWN).unwrap()
}

/// Locality/date/county gazetteer with a single Helsinki row
pub fn helsinki_table() -> ReferenceTable {
    reference_table(&[
        &["locality", "daterange", "county"],
        &["equal", "datebefore", "R"],
        &["Place name", "Last valid date", "County"],
        &["Helsinki", "31.12.2000", "Uusimaa"],
    ])
}
