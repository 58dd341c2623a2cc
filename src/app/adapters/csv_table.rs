//! Delimited text file adapters
//!
//! [`CsvSource`] reads a whole delimited file into a [`MemoryTable`];
//! [`CsvSink`] streams output rows to a new file. Delimited files carry no
//! cell styling, so edit markers are not written.

use super::memory_table::MemoryTable;
use super::tabular::{ColumnLayout, TabularSink, TabularSource};
use crate::app::models::OutputRow;
use crate::{Error, Result};
use csv::{ReaderBuilder, Writer, WriterBuilder};
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Convert a configured delimiter string into the single byte the csv crate expects
pub fn delimiter_byte(delimiter: &str) -> Result<u8> {
    match delimiter {
        "\\t" | "tab" => Ok(b'\t'),
        d if d.len() == 1 => Ok(d.as_bytes()[0]),
        d => Err(Error::configuration(format!(
            "Delimiter must be a single ASCII character, got '{}'",
            d
        ))),
    }
}

/// A delimited file loaded into memory
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    table: MemoryTable,
}

impl CsvSource {
    /// Read a delimited file. Entirely empty columns are dropped.
    ///
    /// # Errors
    /// * `Error::FileNotFound` if the file does not exist
    /// * `Error::CsvParsing` for unreadable or malformed content
    pub fn open(path: &Path, delimiter: u8) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::file_not_found(path.display().to_string()));
        }
        let file_name = path.display().to_string();

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| Error::csv_parsing(&file_name, "Failed to open file", Some(e)))?;

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record.map_err(|e| {
                Error::csv_parsing(&file_name, format!("Failed to read row {}", index + 1), Some(e))
            })?;
            rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }
        debug!("Read {} rows from {}", rows.len(), file_name);

        Ok(Self {
            path: path.to_path_buf(),
            table: MemoryTable::new(file_name, rows).without_empty_columns(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &MemoryTable {
        &self.table
    }

    pub fn into_table(self) -> MemoryTable {
        self.table
    }
}

impl TabularSource for CsvSource {
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

/// Output sink writing a new delimited file
///
/// The header row is written with the first data row, so every column has
/// to be added before anything is written.
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
    layout: ColumnLayout,
    writer: Writer<File>,
    header_written: bool,
    rows_written: usize,
}

impl CsvSink {
    /// Create the output file. An existing file is never overwritten.
    ///
    /// # Errors
    /// * `Error::OutputExists` if the file already exists
    /// * `Error::Io` if the file cannot be created
    pub fn create(path: &Path, columns: &[String], delimiter: u8) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => Error::output_exists(path.display().to_string()),
                _ => Error::io(format!("Failed to create {}", path.display()), e),
            })?;

        let writer = WriterBuilder::new()
            .delimiter(delimiter)
            .flexible(false)
            .from_writer(file);

        Ok(Self {
            path: path.to_path_buf(),
            layout: ColumnLayout::new(columns),
            writer,
            header_written: false,
            rows_written: 0,
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
            self.writer
                .write_record(self.layout.names())
                .map_err(|e| self.csv_error("Failed to write header row", e))?;
            self.header_written = true;
        }
        Ok(())
    }

    fn csv_error(&self, message: &str, source: csv::Error) -> Error {
        Error::csv_parsing(self.path.display().to_string(), message, Some(source))
    }
}

impl TabularSink for CsvSink {
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
        self.writer
            .write_record(&values)
            .map_err(|e| self.csv_error(&format!("Failed to write row {}", self.rows_written + 2), e))?;
        self.rows_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.write_header()?;
        self.writer
            .flush()
            .map_err(|e| Error::io(format!("Failed to flush {}", self.path.display()), e))
    }
}
