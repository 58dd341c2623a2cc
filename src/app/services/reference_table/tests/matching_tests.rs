//! Tests for match finding

use super::*;
use crate::app::models::Row;
use crate::app::services::reference_table::MatchLocation;
use crate::app::services::reference_table::matching::find_matches_in_tables;
use crate::app::services::rules::{MatchCode, RowTest};
use crate::{Error, Result};
use std::cell::Cell;

/// Rule stub returning a fixed code and counting its evaluations
struct CountingTest {
    column: usize,
    code: MatchCode,
    calls: Cell<usize>,
}

impl CountingTest {
    fn new(column: usize, code: MatchCode) -> Self {
        Self {
            column,
            code,
            calls: Cell::new(0),
        }
    }
}

impl RowTest for CountingTest {
    fn column_index(&self) -> usize {
        self.column
    }

    fn evaluate(&self, _input: &Row, _reference_value: &str) -> Result<MatchCode> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.code)
    }
}

fn input(locality: &str, daterange: &str) -> Row {
    Row::from_pairs([("Locality", locality), ("DateRange", daterange)])
}

#[test]
fn test_case_insensitive_single_match() {
    let table = helsinki_table();
    let matches = table
        .find_matches_with_rules(&input("helsinki", "15.3.1999"), &plain_normalizer())
        .unwrap();
    assert_eq!(matches, vec![4]);
}

#[test]
fn test_no_match_for_unknown_locality() {
    let table = helsinki_table();
    let matches = table
        .find_matches_with_rules(&input("Turku", "15.3.1999"), &plain_normalizer())
        .unwrap();
    assert!(matches.is_empty());
}

#[test]
fn test_date_after_reference_fails() {
    let table = helsinki_table();
    let matches = table
        .find_matches_with_rules(&input("Helsinki", "1.1.2001"), &plain_normalizer())
        .unwrap();
    assert!(matches.is_empty());
}

#[test]
fn test_ambiguous_rows_are_all_returned_in_order() {
    let table = reference_table(&[
        &["locality", "daterange", "county"],
        &["equal", "datebefore", "R"],
        &["", "", ""],
        &["Helsinki", "31.12.2000", "Uusimaa"],
        &["Turku", "31.12.2000", "Varsinais-Suomi"],
        &["Helsinki", "2010", "Nyland"],
    ]);
    let matches = table
        .find_matches_with_rules(&input("Helsinki", "15.3.1999"), &plain_normalizer())
        .unwrap();
    assert_eq!(matches, vec![4, 6]);
}

#[test]
fn test_all_wildcard_row_never_matches() {
    let table = reference_table(&[
        &["locality", "daterange", "county"],
        &["equal", "datebefore", "R"],
        &["", "", ""],
        &["*", "*", "Anywhere"],
        &["*", "31.12.2000", "Before 2001"],
    ]);
    let matches = table
        .find_matches_with_rules(&input("Kotka", "1.1.1950"), &plain_normalizer())
        .unwrap();
    assert_eq!(matches, vec![5]);
}

#[test]
fn test_first_failure_short_circuits_remaining_rules() {
    let table = helsinki_table();
    let rules = [
        CountingTest::new(0, MatchCode::Failure),
        CountingTest::new(1, MatchCode::Success),
        CountingTest::new(2, MatchCode::Success),
    ];

    let matches = table
        .find_matches(&input("Helsinki", ""), &rules, &plain_normalizer())
        .unwrap();

    assert!(matches.is_empty());
    assert_eq!(rules[0].calls.get(), 1);
    assert_eq!(rules[1].calls.get(), 0);
    assert_eq!(rules[2].calls.get(), 0);
}

#[test]
fn test_rules_are_evaluated_per_data_row() {
    let table = reference_table(&[
        &["locality"],
        &["equal"],
        &[""],
        &["a"],
        &["b"],
        &["c"],
    ]);
    let rules = [CountingTest::new(0, MatchCode::Success)];
    let matches = table
        .find_matches(&Row::new(), &rules, &plain_normalizer())
        .unwrap();
    assert_eq!(matches, vec![4, 5, 6]);
    assert_eq!(rules[0].calls.get(), 3);
}

#[test]
fn test_unparseable_date_abandons_the_search() {
    let table = helsinki_table();
    let err = table
        .find_matches_with_rules(&input("Helsinki", "spring 1999"), &plain_normalizer())
        .unwrap_err();
    assert!(matches!(err, Error::DateFormat { .. }));
    assert!(err.is_row_recoverable());
}

#[test]
fn test_input_is_normalized_before_testing() {
    let table = reference_table(&[
        &["locality", "county"],
        &["equal", "R"],
        &["", ""],
        &["Helsinki Kallio", "Uusimaa"],
    ]);
    let normalizer = TextNormalizer::new(".", [(r"^Hki\b", "Helsinki")]).unwrap();
    let row = Row::from_pairs([("locality", "Hki   Kallio.")]);

    let matches = table.find_matches_with_rules(&row, &normalizer).unwrap();

    assert_eq!(matches, vec![4]);
}

#[test]
fn test_matches_are_collected_across_tables() {
    let tables = vec![
        helsinki_table(),
        reference_table(&[
            &["locality", "county"],
            &["equal", "R"],
            &["", ""],
            &["Turku", "Varsinais-Suomi"],
            &["Helsinki", "Uusimaa"],
        ]),
    ];

    let locations =
        find_matches_in_tables(&tables, &input("Helsinki", "1.1.1990"), &plain_normalizer())
            .unwrap();

    assert_eq!(
        locations,
        vec![
            MatchLocation { table: 0, row: 4 },
            MatchLocation { table: 1, row: 5 },
        ]
    );
    assert_eq!(locations[1].to_string(), "2:5");
}
