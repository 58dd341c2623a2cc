//! Opening input tables and output sinks by file type

use super::csv_table::{CsvSink, CsvSource};
use super::memory_table::MemoryTable;
use super::tabular::TabularSink;
use super::xlsx_table::{XlsxSink, XlsxSource, is_workbook};
use crate::Result;
use crate::config::OutputFormat;
use std::path::Path;
use tracing::debug;

/// Read a table from a workbook or a delimited file, chosen by extension.
///
/// `sheet` selects the worksheet of a workbook; delimited files have no
/// sheets and ignore it. `delimiter` applies to delimited files only.
pub fn read_table(path: &Path, sheet: Option<&str>, delimiter: u8) -> Result<MemoryTable> {
    if is_workbook(path) {
        return Ok(XlsxSource::open(path, sheet)?.into_table());
    }
    if let Some(sheet) = sheet {
        debug!(
            "Sheet name '{}' does not apply to delimited file {}",
            sheet,
            path.display()
        );
    }
    Ok(CsvSource::open(path, delimiter)?.into_table())
}

/// Create the output sink for a format. An existing file is never overwritten.
///
/// Workbook outputs get a worksheet named `sheet` when given.
pub fn create_sink(
    path: &Path,
    columns: &[String],
    format: OutputFormat,
    delimiter: u8,
    sheet: Option<&str>,
) -> Result<Box<dyn TabularSink>> {
    match format {
        OutputFormat::Csv => Ok(Box::new(CsvSink::create(path, columns, delimiter)?)),
        OutputFormat::Xlsx | OutputFormat::FastXlsx => {
            Ok(Box::new(XlsxSink::create(path, columns, sheet)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::adapters::tabular::TabularSource;
    use crate::app::models::{OutputRow, Row};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_read_table_ignores_sheet_for_delimited_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("known.csv");
        fs::write(&path, "locality;county\nequal;R\n").unwrap();

        let table = read_table(&path, Some("Known"), b';').unwrap();

        assert_eq!(table.column_names(), &["locality", "county"]);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_sinks_follow_output_format() {
        let dir = TempDir::new().unwrap();
        let columns = vec!["locality".to_string()];
        let row = OutputRow::from_input(&Row::from_pairs([("locality", "Turku")]));

        for (file, format) in [
            ("out.csv", OutputFormat::Csv),
            ("out.xlsx", OutputFormat::Xlsx),
            ("out.fast.xlsx", OutputFormat::FastXlsx),
        ] {
            let path = dir.path().join(file);
            let mut sink = create_sink(&path, &columns, format, b';', Some("Records")).unwrap();
            sink.write_row(&row).unwrap();
            sink.finish().unwrap();
            drop(sink);

            let table = read_table(&path, Some("Records"), b';').unwrap();
            assert_eq!(table.column_names(), &["locality"], "{}", format);
            assert_eq!(table.get_value(2, 0), Some("Turku"), "{}", format);
        }

        let written = fs::read_to_string(dir.path().join("out.csv")).unwrap();
        assert_eq!(written, "locality\nTurku\n");
    }
}
