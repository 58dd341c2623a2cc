//! Georeferencing Processor Library
//!
//! A Rust library for georeferencing biological and locality records held in
//! tabular files against a "known data" reference table (a gazetteer).
//!
//! This library provides tools for:
//! - Parsing per-column matching rules from the reference table header rows
//! - Normalizing locality text before comparison
//! - Finding the reference rows that match an input row, with a conservative
//!   ambiguity policy
//! - Merging a single matched reference row into the output row while
//!   tracking which cells were edited
//! - Reading and writing delimited files and spreadsheet workbooks through a
//!   tabular source/sink interface

pub mod config;
pub mod constants;

// Core application modules
pub mod app {
    pub mod models;
    pub mod services {
        pub mod merge;
        pub mod reference_table;
        pub mod row_processor;
        pub mod rules;
        pub mod temporal;
        pub mod text_normalizer;
    }
    pub mod adapters {
        pub mod csv_table;
        pub mod files;
        pub mod memory_table;
        pub mod tabular;
        pub mod xlsx_table;
    }
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use app::models::{EditMarker, OutputRow, Row};
pub use app::services::reference_table::ReferenceTable;
pub use app::services::rules::{MatchCode, Rule, RuleType};
pub use config::{Config, EngineSettings};

/// Result type alias for the georeferencing processor
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for georeferencing operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV reading or writing error
    #[error("CSV error in file '{file}': {message}")]
    CsvParsing {
        file: String,
        message: String,
        #[source]
        source: Option<csv::Error>,
    },

    /// Bad or missing configuration value
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Spreadsheet workbook reading or writing error
    #[error("Spreadsheet error in file '{file}': {message}")]
    Spreadsheet { file: String, message: String },

    /// Configuration file is not valid TOML or has wrongly typed values
    #[error("Config file '{path}' parsing failed: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// A text substitution pattern does not compile
    #[error("Invalid substitution pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Rule row token that is not a known rule type
    #[error("Unknown test type '{token}' for column '{column}'")]
    UnknownRuleType { column: String, token: String },

    /// Date string not accepted by any supported date format
    #[error("Date format not recognised for '{value}'")]
    DateFormat { value: String },

    /// Column name already present in the output table, or empty
    #[error("Column name '{name}' is empty or does already exist")]
    DuplicateColumn { name: String },

    /// Empty cell in a header row
    #[error("File {file}, column {column}: Empty column name (first row) not allowed")]
    EmptyHeader { file: String, column: usize },

    /// Table without enough rows for its header structure
    #[error("File {file} too short: {rows} rows, needs at least {required}")]
    TableTooShort {
        file: String,
        rows: usize,
        required: usize,
    },

    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Refusing to overwrite an existing output file
    #[error("File {path} exists. Will not overwrite")]
    OutputExists { path: String },

    /// Unsupported input or output format
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// Output schema changed after the first row was written
    #[error("Cannot add columns to {file} after rows have been written")]
    ColumnsFrozen { file: String },

    /// Merging a matched row into the output failed
    #[error("Merge error: {message}")]
    Merge { message: String },
}

impl Error {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a CSV error with context
    pub fn csv_parsing(
        file: impl Into<String>,
        message: impl Into<String>,
        source: Option<csv::Error>,
    ) -> Self {
        Self::CsvParsing {
            file: file.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a spreadsheet error with context
    pub fn spreadsheet(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Spreadsheet {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a config file parse error
    pub fn config_parse(path: impl Into<String>, source: toml::de::Error) -> Self {
        Self::ConfigParse {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid substitution pattern error
    pub fn invalid_pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            source,
        }
    }

    /// Create an unknown rule type error
    pub fn unknown_rule_type(column: impl Into<String>, token: impl Into<String>) -> Self {
        Self::UnknownRuleType {
            column: column.into(),
            token: token.into(),
        }
    }

    /// Create a date format error
    pub fn date_format(value: impl Into<String>) -> Self {
        Self::DateFormat {
            value: value.into(),
        }
    }

    /// Create a duplicate column error
    pub fn duplicate_column(name: impl Into<String>) -> Self {
        Self::DuplicateColumn { name: name.into() }
    }

    /// Create an empty header error (column is 1-based)
    pub fn empty_header(file: impl Into<String>, column: usize) -> Self {
        Self::EmptyHeader {
            file: file.into(),
            column,
        }
    }

    /// Create a table too short error
    pub fn table_too_short(file: impl Into<String>, rows: usize, required: usize) -> Self {
        Self::TableTooShort {
            file: file.into(),
            rows,
            required,
        }
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create an output exists error
    pub fn output_exists(path: impl Into<String>) -> Self {
        Self::OutputExists { path: path.into() }
    }

    /// Create an unsupported format error
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Create a frozen output schema error
    pub fn columns_frozen(file: impl Into<String>) -> Self {
        Self::ColumnsFrozen { file: file.into() }
    }

    /// Create a merge error
    pub fn merge(message: impl Into<String>) -> Self {
        Self::Merge {
            message: message.into(),
        }
    }

    /// Errors that only invalidate the current row's match search.
    ///
    /// Everything else aborts the current file (or the whole run).
    pub fn is_row_recoverable(&self) -> bool {
        matches!(self, Self::DateFormat { .. })
    }
}

// Automatic conversions from common error types
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: "I/O operation failed".to_string(),
            source: error,
        }
    }
}

impl From<csv::Error> for Error {
    fn from(error: csv::Error) -> Self {
        Self::CsvParsing {
            file: "unknown".to_string(),
            message: "CSV processing failed".to_string(),
            source: Some(error),
        }
    }
}
