//! Application constants for the georeferencing processor
//!
//! This module contains the reference table layout, rule tokens, date
//! formats and configuration defaults used throughout the application.

// =============================================================================
// Reference Table Layout
// =============================================================================

/// Row holding the column names (1-based, like spreadsheet rows)
pub const HEADER_ROW: usize = 1;

/// Row holding each column's rule type or output command token
pub const RULE_ROW: usize = 2;

/// First data row of a reference table; row 3 is a free description row
pub const REFERENCE_FIRST_DATA_ROW: usize = 4;

/// Minimum row count of a reference table (header, rule row, one more row)
pub const REFERENCE_MIN_ROWS: usize = 3;

/// Reference cell value meaning "no test for this rule on this row"
pub const WILDCARD_MARKER: &str = "*";

// =============================================================================
// Rule Types
// =============================================================================

/// Rule row tokens recognised as matching rules
pub mod rule_tokens {
    pub const EQUAL: &str = "equal";
    pub const NOT_EMPTY: &str = "notempty";
    pub const DATE_BEFORE: &str = "datebefore";
    pub const DATE_AFTER: &str = "dateafter";

    /// All accepted rule tokens, in the order they are documented
    pub const KNOWN: &[&str] = &[EQUAL, DATE_BEFORE, DATE_AFTER, NOT_EMPTY];
}

// =============================================================================
// Dates
// =============================================================================

/// Separator between day, month and year in date strings
pub const DATE_SEPARATOR: char = '.';

/// Characters stripped from date strings before parsing
pub const DEFAULT_DATE_IGNORE: &[&str] = &["?"];

// =============================================================================
// Configuration Defaults
// =============================================================================

/// First data line of input files (line 1 holds the column names)
pub const DEFAULT_INPUT_FIRST_DATA_LINE: usize = 2;

/// Default field delimiter for delimited files
pub const DEFAULT_DELIMITER: &str = ",";

/// Default output format selector
pub const DEFAULT_OUTPUT_FORMAT: &str = "csv";

/// Default marker inserted into output file names
pub const DEFAULT_FILENAME_ADD: &str = "georef";

/// Default connector between appended values (a space is added after it)
pub const DEFAULT_APPEND_CONNECTOR: &str = ";";

/// Default 1-based insertion position for new output columns
pub const DEFAULT_NEW_COLUMN_POSITION: usize = 1;

/// Application directory name under the user config directory
pub const CONFIG_DIR_NAME: &str = "georef-processor";

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Rows between progress log messages
pub const PROGRESS_LOG_INTERVAL: usize = 10;
