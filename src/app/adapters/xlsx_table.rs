//! Spreadsheet workbook adapters
//!
//! [`XlsxSource`] reads one worksheet of a workbook (xlsx, xlsm, xlsb, xls
//! or ods) into a [`MemoryTable`]. [`XlsxSink`] collects output rows in a
//! new xlsx worksheet and saves the workbook when finished. Cells are
//! written as text without styling.

use super::memory_table::MemoryTable;
use super::tabular::{ColumnLayout, TabularSink, TabularSource};
use crate::app::models::OutputRow;
use crate::{Error, Result};
use calamine::{Data, Reader, open_workbook_auto};
use chrono::Timelike;
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extensions read through the workbook reader
pub const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Whether a path names a spreadsheet workbook (by extension)
pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| WORKBOOK_EXTENSIONS.iter().any(|w| w.eq_ignore_ascii_case(ext)))
}

/// One worksheet of a workbook loaded into memory
#[derive(Debug, Clone)]
pub struct XlsxSource {
    path: PathBuf,
    sheet: String,
    table: MemoryTable,
}

impl XlsxSource {
    /// Read a worksheet, the first one when `sheet` is `None`.
    /// Entirely empty columns are dropped.
    ///
    /// # Errors
    /// * `Error::FileNotFound` if the file does not exist
    /// * `Error::Spreadsheet` if the workbook or the worksheet cannot be read
    pub fn open(path: &Path, sheet: Option<&str>) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::file_not_found(path.display().to_string()));
        }
        let file_name = path.display().to_string();

        let mut workbook = open_workbook_auto(path).map_err(|e| {
            Error::spreadsheet(&file_name, format!("Failed to open workbook: {}", e))
        })?;

        let sheet = match sheet {
            Some(name) => name.to_string(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| Error::spreadsheet(&file_name, "Workbook has no worksheets"))?,
        };
        let range = workbook.worksheet_range(&sheet).map_err(|e| {
            Error::spreadsheet(
                &file_name,
                format!("Failed to read worksheet '{}': {}", sheet, e),
            )
        })?;

        // The used range may start below or right of A1; keep cell positions
        let (first_row, first_col) = range.start().unwrap_or((0, 0));
        let mut rows: Vec<Vec<String>> = vec![Vec::new(); first_row as usize];
        for cells in range.rows() {
            let mut row = vec![String::new(); first_col as usize];
            row.extend(cells.iter().map(cell_text));
            rows.push(row);
        }
        debug!(
            "Read {} rows from worksheet '{}' of {}",
            rows.len(),
            sheet,
            file_name
        );

        Ok(Self {
            path: path.to_path_buf(),
            sheet,
            table: MemoryTable::new(file_name, rows).without_empty_columns(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the worksheet that was read
    pub fn sheet_name(&self) -> &str {
        &self.sheet
    }

    pub fn into_table(self) -> MemoryTable {
        self.table
    }
}

impl TabularSource for XlsxSource {
    fn name(&self) -> &str {
        self.table.name()
    }

    fn column_names(&self) -> &[String] {
        self.table.column_names()
    }

    fn row_count(&self) -> usize {
        self.table.row_count()
    }

    fn get_row(&self, row: usize) -> Option<&[String]> {
        self.table.get_row(row)
    }
}

/// Cell text as the matching engine sees it. Dates use the `d.m.yyyy` form
/// the date rules accept.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) if value.num_seconds_from_midnight() == 0 => {
                value.format("%-d.%-m.%Y").to_string()
            }
            Some(value) => value.format("%-d.%-m.%Y %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
        other => other.to_string(),
    }
}

/// Output sink building a new xlsx workbook
///
/// The output file is reserved on creation so an existing file is never
/// overwritten; the workbook itself is written by [`TabularSink::finish`].
pub struct XlsxSink {
    path: PathBuf,
    layout: ColumnLayout,
    worksheet: Worksheet,
    header_written: bool,
    rows_written: usize,
    saved: bool,
}

impl XlsxSink {
    /// Reserve the output file and start an empty worksheet, named `sheet`
    /// when given.
    ///
    /// # Errors
    /// * `Error::Spreadsheet` for an invalid worksheet name
    /// * `Error::OutputExists` if the file already exists
    /// * `Error::Io` if the file cannot be created
    pub fn create(path: &Path, columns: &[String], sheet: Option<&str>) -> Result<Self> {
        let mut worksheet = Worksheet::new();
        if let Some(name) = sheet {
            worksheet.set_name(name).map_err(|e| {
                xlsx_error(path, &format!("Invalid worksheet name '{}'", name), e)
            })?;
        }

        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => Error::output_exists(path.display().to_string()),
                _ => Error::io(format!("Failed to create {}", path.display()), e),
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            layout: ColumnLayout::new(columns),
            worksheet,
            header_written: false,
            rows_written: 0,
            saved: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows written so far (the header row excluded)
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    fn write_header(&mut self) -> Result<()> {
        if !self.header_written {
            let names = self.layout.names().to_vec();
            self.write_cells(0, &names)?;
            self.header_written = true;
        }
        Ok(())
    }

    fn write_cells(&mut self, row: usize, values: &[String]) -> Result<()> {
        let row_number = u32::try_from(row)
            .map_err(|_| Error::spreadsheet(self.path.display().to_string(), "Too many rows"))?;
        for (col, value) in values.iter().enumerate().filter(|(_, v)| !v.is_empty()) {
            let col_number = u16::try_from(col).map_err(|_| {
                Error::spreadsheet(self.path.display().to_string(), "Too many columns")
            })?;
            self.worksheet
                .write_string(row_number, col_number, value)
                .map_err(|e| xlsx_error(&self.path, &format!("Failed to write row {}", row + 1), e))?;
        }
        Ok(())
    }
}

impl TabularSink for XlsxSink {
    fn column_names(&self) -> &[String] {
        self.layout.names()
    }

    fn add_column(&mut self, position: usize, header_labels: &[&str]) -> Result<()> {
        if self.header_written {
            return Err(Error::columns_frozen(self.path.display().to_string()));
        }
        self.layout.add_column(position, header_labels)
    }

    fn write_row(&mut self, row: &OutputRow) -> Result<()> {
        self.write_header()?;
        let (values, _edits) = self.layout.arrange(row, self.rows_written);
        self.write_cells(self.rows_written + 1, &values)?;
        self.rows_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.saved {
            return Ok(());
        }
        self.write_header()?;

        let mut workbook = Workbook::new();
        workbook.push_worksheet(std::mem::replace(&mut self.worksheet, Worksheet::new()));
        workbook
            .save(&self.path)
            .map_err(|e| xlsx_error(&self.path, "Failed to save workbook", e))?;
        self.saved = true;
        Ok(())
    }
}

fn xlsx_error(path: &Path, message: &str, source: XlsxError) -> Error {
    Error::spreadsheet(path.display().to_string(), format!("{}: {}", message, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{EditMarker, Row};
    use rust_xlsxwriter::{ExcelDateTime, Format};
    use tempfile::TempDir;

    fn records_workbook(path: &Path) {
        let mut workbook = Workbook::new();

        let cover = workbook.add_worksheet();
        cover.set_name("Cover").unwrap();
        cover.write_string(0, 0, "Survey records").unwrap();

        let date_format = Format::new().set_num_format("d.m.yyyy");
        let date = ExcelDateTime::from_ymd(1920, 6, 1).unwrap();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Records").unwrap();
        sheet.write_string(0, 0, "Locality").unwrap();
        sheet.write_string(0, 2, "Lat").unwrap();
        sheet.write_string(0, 3, "Date").unwrap();
        sheet.write_string(0, 4, "Year").unwrap();
        sheet.write_string(1, 0, "Helsinki").unwrap();
        sheet.write_number(1, 2, 60.17).unwrap();
        sheet
            .write_datetime_with_format(1, 3, &date, &date_format)
            .unwrap();
        sheet.write_number(1, 4, 1920.0).unwrap();

        workbook.save(path).unwrap();
    }

    #[test]
    fn test_is_workbook_by_extension() {
        assert!(is_workbook(Path::new("records.xlsx")));
        assert!(is_workbook(Path::new("known/Finland.XLS")));
        assert!(is_workbook(Path::new("places.ods")));
        assert!(!is_workbook(Path::new("records.csv")));
        assert!(!is_workbook(Path::new("records")));
    }

    #[test]
    fn test_source_reads_named_sheet_as_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.xlsx");
        records_workbook(&path);

        let source = XlsxSource::open(&path, Some("Records")).unwrap();

        assert_eq!(source.sheet_name(), "Records");
        assert_eq!(source.column_names(), &["Locality", "Lat", "Date", "Year"]);
        assert_eq!(source.row_count(), 2);
        assert_eq!(
            source.get_row(2).unwrap(),
            &["Helsinki", "60.17", "1.6.1920", "1920"]
        );
    }

    #[test]
    fn test_source_defaults_to_first_sheet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.xlsx");
        records_workbook(&path);

        let source = XlsxSource::open(&path, None).unwrap();

        assert_eq!(source.sheet_name(), "Cover");
        assert_eq!(source.column_names(), &["Survey records"]);
    }

    #[test]
    fn test_source_missing_sheet_and_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.xlsx");
        records_workbook(&path);

        let err = XlsxSource::open(&path, Some("Places")).unwrap_err();
        assert!(matches!(err, Error::Spreadsheet { .. }));

        let err = XlsxSource::open(&dir.path().join("missing.xlsx"), None).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_sink_output_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.xlsx");
        let columns = vec!["locality".to_string()];

        let mut sink = XlsxSink::create(&path, &columns, Some("Georeferenced")).unwrap();
        sink.add_column(1, &["county"]).unwrap();
        for (locality, county) in [("Helsinki", "Uusimaa"), ("Turku", "")] {
            let mut out = OutputRow::with_columns(
                &Row::from_pairs([("locality", locality)]),
                sink.column_names(),
            );
            out.set("county", county, EditMarker::Replaced);
            sink.write_row(&out).unwrap();
        }
        sink.finish().unwrap();
        assert_eq!(sink.rows_written(), 2);

        let source = XlsxSource::open(&path, Some("Georeferenced")).unwrap();
        assert_eq!(source.column_names(), &["county", "locality"]);
        assert_eq!(source.get_row(2).unwrap(), &["Uusimaa", "Helsinki"]);
        assert_eq!(source.get_row(3).unwrap(), &["", "Turku"]);
    }

    #[test]
    fn test_sink_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.xlsx");
        std::fs::write(&path, "previous").unwrap();

        let err = XlsxSink::create(&path, &[], None).err().unwrap();

        assert!(matches!(err, Error::OutputExists { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous");
    }

    #[test]
    fn test_sink_rejects_columns_after_first_row() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.xlsx");
        let mut sink = XlsxSink::create(&path, &["a".to_string()], None).unwrap();
        sink.write_row(&OutputRow::from_input(&Row::from_pairs([("a", "1")])))
            .unwrap();

        let err = sink.add_column(1, &["b"]).unwrap_err();
        assert!(matches!(err, Error::ColumnsFrozen { .. }));
    }
}
