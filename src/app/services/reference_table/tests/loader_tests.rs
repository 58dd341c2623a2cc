//! Tests for reference table loading and column lookups

use super::*;
use crate::Error;
use crate::app::adapters::tabular::TabularSource;
use crate::app::services::reference_table::OutputAction;
use crate::app::services::rules::{RowTest, RuleType};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

#[test]
fn test_rules_and_layout_are_parsed() {
    let table = helsinki_table();

    assert_eq!(table.column_names(), &["locality", "daterange", "county"]);
    assert_eq!(table.rule_row(), &["equal", "datebefore", "R"]);
    assert_eq!(table.rules().len(), 2);
    assert_eq!(table.rules()[0].rule_type(), RuleType::Equal);
    assert_eq!(table.rules()[1].rule_type(), RuleType::DateBefore);
    assert_eq!(table.first_data_row(), 4);
    assert_eq!(table.data_row_count(), 1);
    assert_eq!(table.getvalue(4, 2), "Uusimaa");
    assert_eq!(table.getvalue(9, 2), "");
}

#[test]
fn test_table_without_data_rows_is_valid() {
    let table = reference_table(&[&["locality"], &["equal"], &["Place"]]);
    assert_eq!(table.data_row_count(), 0);
    assert!(table.data_rows().is_empty());
}

#[test]
fn test_too_short_table_is_rejected() {
    let source = MemoryTable::from_rows("short.csv", &[&["locality"], &["equal"]]);
    let err = ReferenceTable::from_source(&source, 4, rule_tokens::KNOWN).unwrap_err();
    assert!(matches!(
        err,
        Error::TableTooShort {
            rows: 2,
            required: 3,
            ..
        }
    ));
}

#[test]
fn test_empty_header_names_the_column() {
    let source = MemoryTable::from_rows(
        "known.csv",
        &[
            &["locality", "", "county"],
            &["equal", "R", "R"],
            &["", "", ""],
        ],
    );
    let err = ReferenceTable::from_source(&source, 4, rule_tokens::KNOWN).unwrap_err();
    assert!(matches!(err, Error::EmptyHeader { column: 2, .. }));
}

#[test]
fn test_unknown_rule_type_is_fatal() {
    let source = MemoryTable::from_rows("known.csv", &[&["locality"], &["fuzzy"], &[""]]);
    let err = ReferenceTable::from_source(&source, 4, &["equal", "fuzzy"]).unwrap_err();
    assert!(matches!(err, Error::UnknownRuleType { .. }));
}

#[test]
fn test_first_data_row_must_follow_rule_row() {
    let source = MemoryTable::from_rows("known.csv", &[&["locality"], &["equal"], &["x"]]);
    let err = ReferenceTable::from_source(&source, 2, rule_tokens::KNOWN).unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));
}

#[test]
fn test_output_action_comes_from_first_column_with_the_name() {
    let table = reference_table(&[
        &["Locality", "County", "county", "Notes", "Lat", "Lon", "LON"],
        &["equal", "equal", "A", "F", "N", "R", "A"],
        &["", "", "", "", "", "", ""],
        &["Helsinki", "Uusimaa", "Uusimaa", "n", "60.17", "24.94", "25"],
    ]);
    let commands = commands();

    assert_eq!(
        table.output_action_for_column("COUNTY", &commands),
        OutputAction::Ignore
    );
    assert_eq!(
        table.output_action_for_column("lon", &commands),
        OutputAction::Replace
    );
    assert_eq!(
        table.output_action_for_column("notes", &commands),
        OutputAction::FillIfEmpty
    );
    assert_eq!(
        table.output_action_for_column("lat", &commands),
        OutputAction::Ignore
    );
    assert_eq!(
        table.output_action_for_column("locality", &commands),
        OutputAction::Ignore
    );
    assert_eq!(
        table.output_action_for_column("missing", &commands),
        OutputAction::Ignore
    );
}

#[test]
fn test_output_column_names_lists_active_commands_in_order() {
    let table = reference_table(&[
        &["Locality", "Lat", "Lon", "Source", "Notes"],
        &["equal", "R", "R", "N", "A"],
        &["", "", "", "", ""],
    ]);
    assert_eq!(
        table.output_column_names(&commands()),
        vec!["Lat", "Lon", "Notes"]
    );
}

#[test]
fn test_duplicate_column_lookup_uses_first_occurrence() {
    let table = reference_table(&[
        &["Locality", "locality"],
        &["equal", "R"],
        &["", ""],
        &["Turku", "Åbo"],
    ]);
    assert_eq!(table.column_index("LOCALITY"), Some(0));
    let row = table.get_row_as_map(4).unwrap();
    assert_eq!(row.get("locality"), Some("Turku"));
}

#[test]
fn test_load_from_delimited_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "locality;daterange;;county").unwrap();
    writeln!(temp_file, "equal;dateafter;;R").unwrap();
    writeln!(temp_file, "Place;Earliest date;;County").unwrap();
    writeln!(temp_file, "Turku;1.1.1900;;Varsinais-Suomi").unwrap();

    let table = ReferenceTable::load(temp_file.path(), None, b';', 4, rule_tokens::KNOWN).unwrap();

    assert_eq!(table.column_names(), &["locality", "daterange", "county"]);
    assert_eq!(table.rules().len(), 2);
    assert_eq!(table.rules()[1].column_index(), 1);
    assert_eq!(table.getvalue(4, 2), "Varsinais-Suomi");
}

#[test]
fn test_load_from_named_workbook_sheet() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("known.xlsx");
    let mut workbook = rust_xlsxwriter::Workbook::new();
    workbook.add_worksheet().set_name("Notes").unwrap();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Known").unwrap();
    for (row, cells) in [
        ["locality", "lat"],
        ["equal", "R"],
        ["Place", "Latitude"],
        ["Turku", "60.45"],
    ]
    .iter()
    .enumerate()
    {
        for (col, value) in cells.iter().enumerate() {
            sheet.write_string(row as u32, col as u16, *value).unwrap();
        }
    }
    workbook.save(&path).unwrap();

    let table = ReferenceTable::load(&path, Some("Known"), b';', 4, rule_tokens::KNOWN).unwrap();

    assert_eq!(table.column_names(), &["locality", "lat"]);
    assert_eq!(table.rules().len(), 1);
    assert_eq!(table.getvalue(4, 1), "60.45");

    let err = ReferenceTable::load(&path, Some("Gazetteer"), b';', 4, rule_tokens::KNOWN)
        .unwrap_err();
    assert!(matches!(err, Error::Spreadsheet { .. }));
}

#[test]
fn test_load_missing_file() {
    let err = ReferenceTable::load(
        Path::new("/nonexistent/known.csv"),
        None,
        b',',
        4,
        rule_tokens::KNOWN,
    )
    .unwrap_err();
    assert!(matches!(err, Error::FileNotFound { .. }));
}

#[test]
fn test_memory_source_roundtrip_keeps_rows() {
    let source = MemoryTable::from_rows(
        "known.csv",
        &[&["locality"], &["equal"], &["Place"], &["Helsinki"], &["Turku"]],
    );
    let table = ReferenceTable::from_source(&source, 4, rule_tokens::KNOWN).unwrap();
    assert_eq!(table.row_count(), source.row_count());
    assert_eq!(table.getvalue(5, 0), "Turku");
}
