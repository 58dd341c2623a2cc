//! Configuration loading and validation.
//!
//! The processor is configured with a TOML file holding three sections,
//! `[inputfiles]`, `[knowndatafiles]` and `[outputfiles]`, plus a few
//! top-level keys. [`Config`] is the deserialized file; after validation it
//! derives the immutable [`EngineSettings`] handed to the matching and merge
//! services.

use crate::app::adapters::csv_table::delimiter_byte;
use crate::app::services::merge::MergeOptions;
use crate::app::services::reference_table::CommandNames;
use crate::app::services::text_normalizer::TextNormalizer;
use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_APPEND_CONNECTOR, DEFAULT_DELIMITER,
    DEFAULT_FILENAME_ADD, DEFAULT_INPUT_FIRST_DATA_LINE, DEFAULT_NEW_COLUMN_POSITION,
    DEFAULT_OUTPUT_FORMAT, HEADER_ROW, REFERENCE_FIRST_DATA_ROW, RULE_ROW,
};
use crate::{Error, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Placeholder expanded to the program name in the transcriber note
const NOTE_PROGRAM_NAME: &str = "{programname}";
/// Placeholder expanded to the program version
const NOTE_VERSION: &str = "{version}";
/// Placeholder expanded to the first known data file name
const NOTE_KNOWN_DATA_FILE: &str = "{knowndatafiles:filenames}";

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Program name, available to the transcriber note
    pub programname: String,

    /// Program version, available to the transcriber note
    pub version: String,

    /// Characters deleted from input values before comparison
    pub ignore_in_comparison: String,

    pub inputfiles: InputFilesConfig,
    pub knowndatafiles: KnownDataConfig,
    pub outputfiles: OutputFilesConfig,
}

/// `[inputfiles]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputFilesConfig {
    /// Worksheet read from workbook inputs and named in workbook outputs
    pub sheetname: Option<String>,

    /// First data line; lines between the header and this one are copied as is
    pub first_data_line: usize,

    /// Rows with content in any of these columns are not georeferenced
    pub skip_if_nonempty: Vec<String>,

    /// Field delimiter of input and output files
    pub delimiter: String,

    /// Regex substitutions applied to input values before comparison, in order
    pub replacements: toml::Table,
}

impl Default for InputFilesConfig {
    fn default() -> Self {
        Self {
            sheetname: None,
            first_data_line: DEFAULT_INPUT_FIRST_DATA_LINE,
            skip_if_nonempty: Vec::new(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            replacements: toml::Table::new(),
        }
    }
}

/// `[knowndatafiles]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnownDataConfig {
    /// Reference table files
    pub filenames: Vec<PathBuf>,

    /// Worksheet read from workbook reference files
    pub sheetname: Option<String>,

    /// First reference data row
    pub first_data_line: usize,

    /// Reference value meaning "keep the original output value"
    pub keep_original_data_marker: Option<String>,

    pub cmd_replace: Option<String>,
    pub cmd_append: Option<String>,
    pub cmd_fillempty: Option<String>,
    pub cmd_nothing: Option<String>,
}

impl Default for KnownDataConfig {
    fn default() -> Self {
        Self {
            filenames: Vec::new(),
            sheetname: None,
            first_data_line: REFERENCE_FIRST_DATA_ROW,
            keep_original_data_marker: None,
            cmd_replace: None,
            cmd_append: None,
            cmd_fillempty: None,
            cmd_nothing: None,
        }
    }
}

/// `[outputfiles]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputFilesConfig {
    /// Output format selector
    pub output_format: String,

    /// Marker inserted into output file names: `<stem>.<marker>.<ext>`
    pub filename_add: String,

    /// Note appended to every georeferenced row
    pub transcribernote: String,

    /// Column receiving the transcriber note
    pub transcribernotefield: Option<String>,

    /// Append the reference file names to the note
    pub transcribernote_appendfilenames: bool,

    /// Append today's date to the note
    pub add_date_to_note: bool,

    /// Connector between appended values; a space is added after it
    pub data_append_connector: String,

    /// 1-based position where new output columns are inserted
    pub new_column_insertion_position: usize,

    /// Column receiving the original values of georeferenced columns
    pub append_original_geodata_to_column: Option<String>,

    /// Label written before the original values
    pub original_geodata_to_column_header: String,
}

impl Default for OutputFilesConfig {
    fn default() -> Self {
        Self {
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            filename_add: DEFAULT_FILENAME_ADD.to_string(),
            transcribernote: String::new(),
            transcribernotefield: None,
            transcribernote_appendfilenames: false,
            add_date_to_note: false,
            data_append_connector: DEFAULT_APPEND_CONNECTOR.to_string(),
            new_column_insertion_position: DEFAULT_NEW_COLUMN_POSITION,
            append_original_geodata_to_column: None,
            original_geodata_to_column_header: String::new(),
        }
    }
}

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Xlsx,
    /// Write-only workbook; the input workbook's cells are not copied
    FastXlsx,
}

impl OutputFormat {
    /// Parse an output format selector (case-insensitive)
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Xlsx),
            "fast-xlsx" => Ok(Self::FastXlsx),
            other => Err(Error::unsupported_format(other.to_uppercase())),
        }
    }

    /// Selector as written in the configuration file
    pub fn token(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::FastXlsx => "fast-xlsx",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx | Self::FastXlsx => "xlsx",
        }
    }

    pub fn is_workbook(self) -> bool {
        !matches!(self, Self::Csv)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token().to_uppercase())
    }
}

/// Immutable settings consumed by the matching and merge services
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Input value normalization used for comparison
    pub normalizer: TextNormalizer,

    /// Merge behaviour, including the output command tokens
    pub merge: MergeOptions,

    /// Rows with content in any of these columns are passed through
    pub skip_if_nonempty: Vec<String>,

    /// First data line of input files
    pub input_first_data_line: usize,

    /// First data row of reference tables
    pub reference_first_data_line: usize,

    /// 1-based insertion position for new output columns
    pub new_column_position: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            normalizer: TextNormalizer::default(),
            merge: MergeOptions::new(
                CommandNames::new("replace", "append", "fillempty", "nothing"),
                "keep",
                format!("{} ", DEFAULT_APPEND_CONNECTOR),
            ),
            skip_if_nonempty: Vec::new(),
            input_first_data_line: DEFAULT_INPUT_FIRST_DATA_LINE,
            reference_first_data_line: REFERENCE_FIRST_DATA_ROW,
            new_column_position: DEFAULT_NEW_COLUMN_POSITION,
        }
    }
}

impl EngineSettings {
    pub fn with_normalizer(mut self, normalizer: TextNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_merge_options(mut self, merge: MergeOptions) -> Self {
        self.merge = merge;
        self
    }

    pub fn with_skip_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_if_nonempty = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_input_first_data_line(mut self, line: usize) -> Self {
        self.input_first_data_line = line;
        self
    }

    pub fn with_new_column_position(mut self, position: usize) -> Self {
        self.new_column_position = position;
        self
    }
}

impl Config {
    /// Read and parse a configuration file
    ///
    /// # Errors
    /// * `Error::FileNotFound` if the file does not exist
    /// * `Error::ConfigParse` if it is not valid TOML for this structure
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::file_not_found(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("Failed to read {}", path.display()), e))?;
        let config = Self::from_toml_str(&content, &path.display().to_string())?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration text; `origin` names the source in errors
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config_parse(origin, e))
    }

    /// Check required keys and value ranges
    ///
    /// # Errors
    /// * `Error::Configuration` for missing or invalid values
    /// * `Error::UnsupportedFormat` for an unknown output format
    pub fn validate(&self) -> Result<()> {
        let known = &self.knowndatafiles;
        if known.filenames.is_empty() {
            return Err(Error::configuration(
                "At least one known data file must be listed in [knowndatafiles] filenames",
            ));
        }
        if known.keep_original_data_marker.is_none() {
            return Err(Error::configuration(
                "keep_original_data_marker must be defined in [knowndatafiles]",
            ));
        }
        let commands = self.command_names()?;
        let tokens = [
            commands.replace.trim(),
            commands.append.trim(),
            commands.fill_empty.trim(),
            commands.nothing.trim(),
        ];
        if tokens.iter().any(|t| t.is_empty()) {
            return Err(Error::configuration("Command names must not be empty"));
        }
        if tokens
            .iter()
            .enumerate()
            .any(|(i, t)| tokens[..i].contains(t))
        {
            return Err(Error::configuration("Command names must be distinct"));
        }

        if self.inputfiles.first_data_line <= HEADER_ROW {
            return Err(Error::configuration(format!(
                "[inputfiles] first_data_line must be greater than {}",
                HEADER_ROW
            )));
        }
        if known.first_data_line <= RULE_ROW {
            return Err(Error::configuration(format!(
                "[knowndatafiles] first_data_line must be greater than {}",
                RULE_ROW
            )));
        }
        delimiter_byte(&self.inputfiles.delimiter)?;
        for (pattern, replacement) in &self.inputfiles.replacements {
            if !replacement.is_str() {
                return Err(Error::configuration(format!(
                    "Replacement for pattern '{}' must be a string",
                    pattern
                )));
            }
        }

        let output = &self.outputfiles;
        OutputFormat::parse(&output.output_format)?;
        if output.filename_add.trim().is_empty() {
            return Err(Error::configuration(
                "[outputfiles] filename_add must not be empty",
            ));
        }
        if self.has_transcriber_note()
            && output
                .transcribernotefield
                .as_deref()
                .is_none_or(|f| f.trim().is_empty())
        {
            return Err(Error::configuration(
                "transcribernotefield must be defined when a transcriber note is written",
            ));
        }
        if output.new_column_insertion_position == 0 {
            return Err(Error::configuration(
                "new_column_insertion_position is 1-based and must be at least 1",
            ));
        }
        Ok(())
    }

    /// The output command tokens
    ///
    /// # Errors
    /// * `Error::Configuration` if any command name is missing
    pub fn command_names(&self) -> Result<CommandNames> {
        let known = &self.knowndatafiles;
        let missing: Vec<&str> = [
            ("cmd_replace", &known.cmd_replace),
            ("cmd_append", &known.cmd_append),
            ("cmd_fillempty", &known.cmd_fillempty),
            ("cmd_nothing", &known.cmd_nothing),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(key, _)| key)
        .collect();
        if !missing.is_empty() {
            return Err(Error::configuration(format!(
                "Command names must be defined in the config file: {}",
                missing.join(", ")
            )));
        }

        Ok(CommandNames::new(
            known.cmd_replace.clone().unwrap_or_default(),
            known.cmd_append.clone().unwrap_or_default(),
            known.cmd_fillempty.clone().unwrap_or_default(),
            known.cmd_nothing.clone().unwrap_or_default(),
        ))
    }

    /// Separator between appended values
    pub fn append_separator(&self) -> String {
        format!("{} ", self.outputfiles.data_append_connector)
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        OutputFormat::parse(&self.outputfiles.output_format)
    }

    pub fn delimiter(&self) -> Result<u8> {
        delimiter_byte(&self.inputfiles.delimiter)
    }

    /// Whether any part of the transcriber note is configured
    pub fn has_transcriber_note(&self) -> bool {
        let output = &self.outputfiles;
        !output.transcribernote.is_empty()
            || output.transcribernote_appendfilenames
            || output.add_date_to_note
    }

    /// The transcriber note with placeholders expanded, file names and date appended
    ///
    /// File names and date are appended even when the note text itself is
    /// empty, giving a note such as `" a.xlsx, b.xlsx (2024-05-17)"`.
    pub fn transcriber_note(&self, today: NaiveDate) -> String {
        let output = &self.outputfiles;
        let first_file = self
            .knowndatafiles
            .filenames
            .first()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let mut note = output
            .transcribernote
            .replace(NOTE_PROGRAM_NAME, &self.programname)
            .replace(NOTE_VERSION, &self.version)
            .replace(NOTE_KNOWN_DATA_FILE, &first_file);

        if output.transcribernote_appendfilenames {
            let files: Vec<String> = self
                .knowndatafiles
                .filenames
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            note.push(' ');
            note.push_str(&files.join(", "));
        }
        if output.add_date_to_note {
            note.push_str(&format!(" ({})", today.format("%Y-%m-%d")));
        }
        note
    }

    /// Validate and derive engine settings, dating the note today
    pub fn engine_settings(&self) -> Result<EngineSettings> {
        self.engine_settings_on(Local::now().date_naive())
    }

    /// Validate and derive engine settings, dating the note `today`
    ///
    /// # Errors
    /// * every error of [`Config::validate`]
    /// * `Error::InvalidPattern` if a replacement pattern does not compile
    pub fn engine_settings_on(&self, today: NaiveDate) -> Result<EngineSettings> {
        self.validate()?;

        let substitutions: Vec<(&str, String)> = self
            .inputfiles
            .replacements
            .iter()
            .map(|(pattern, replacement)| {
                (
                    pattern.as_str(),
                    replacement.as_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let normalizer = TextNormalizer::new(&self.ignore_in_comparison, substitutions)?;

        let output = &self.outputfiles;
        let mut merge = MergeOptions::new(
            self.command_names()?,
            self.knowndatafiles
                .keep_original_data_marker
                .as_deref()
                .unwrap_or_default(),
            self.append_separator(),
        );
        if let Some(column) = non_empty(output.append_original_geodata_to_column.as_deref()) {
            merge = merge.with_provenance(column, &output.original_geodata_to_column_header);
        }
        let note = self.transcriber_note(today);
        if let Some(column) = non_empty(output.transcribernotefield.as_deref()) {
            if !note.is_empty() {
                merge = merge.with_note(column, note);
            }
        }

        Ok(EngineSettings {
            normalizer,
            merge,
            skip_if_nonempty: self
                .inputfiles
                .skip_if_nonempty
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            input_first_data_line: self.inputfiles.first_data_line,
            reference_first_data_line: self.knowndatafiles.first_data_line,
            new_column_position: output.new_column_insertion_position,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Default configuration file location: `<config dir>/georef-processor/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
programname = "georef"
version = "2.95"
ignore_in_comparison = ".:"

[inputfiles]
first_data_line = 3
skip_if_nonempty = ["Latitude", " "]

[inputfiles.replacements]
"^Hki\\b" = "Helsinki"
"\\s+mlk$" = " rural"

[knowndatafiles]
filenames = ["known/finland.csv", "known/sweden.csv"]
keep_original_data_marker = "KEEP"
cmd_replace = "R"
cmd_append = "A"
cmd_fillempty = "F"
cmd_nothing = "N"

[outputfiles]
transcribernote = "Georeferenced with {programname} {version} from {knowndatafiles:filenames}"
transcribernotefield = "Notes"
transcribernote_appendfilenames = true
add_date_to_note = true
data_append_connector = "|"
append_original_geodata_to_column = "georef_old"
original_geodata_to_column_header = "Original:"
"#;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    fn sample() -> Config {
        Config::from_toml_str(SAMPLE, "sample.toml").unwrap()
    }

    #[test]
    fn test_defaults_fill_missing_keys() {
        let config = sample();
        assert_eq!(config.inputfiles.delimiter, ",");
        assert_eq!(config.knowndatafiles.first_data_line, 4);
        assert_eq!(config.outputfiles.output_format, "csv");
        assert_eq!(config.outputfiles.filename_add, "georef");
        assert_eq!(config.outputfiles.new_column_insertion_position, 1);
    }

    #[test]
    fn test_replacements_keep_file_order() {
        let config = sample();
        let patterns: Vec<&String> = config.inputfiles.replacements.keys().collect();
        assert_eq!(patterns, vec!["^Hki\\b", "\\s+mlk$"]);
    }

    #[test]
    fn test_engine_settings_from_sample() {
        let settings = sample().engine_settings_on(today()).unwrap();

        assert_eq!(settings.input_first_data_line, 3);
        assert_eq!(settings.skip_if_nonempty, vec!["Latitude"]);
        assert_eq!(settings.normalizer.normalize("Hki: Kallio."), "Helsinki Kallio");
        assert_eq!(settings.merge.keep_marker, "keep");
        assert_eq!(settings.merge.separator, "| ");
        assert_eq!(settings.merge.commands.replace, "R");
        assert_eq!(settings.merge.provenance_column.as_deref(), Some("georef_old"));
        assert_eq!(settings.merge.note_column.as_deref(), Some("Notes"));
    }

    #[test]
    fn test_transcriber_note_expansion() {
        let note = sample().transcriber_note(today());
        assert_eq!(
            note,
            "Georeferenced with georef 2.95 from known/finland.csv \
             known/finland.csv, known/sweden.csv (2024-05-17)"
        );
    }

    #[test]
    fn test_missing_commands_are_reported() {
        let mut config = sample();
        config.knowndatafiles.cmd_fillempty = None;
        config.knowndatafiles.cmd_nothing = None;

        let err = config.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Command names must be defined"));
        assert!(message.contains("cmd_fillempty, cmd_nothing"));
    }

    #[test]
    fn test_duplicate_commands_are_rejected() {
        let mut config = sample();
        config.knowndatafiles.cmd_append = Some("R".to_string());
        assert!(matches!(
            config.validate(),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_note_requires_target_column() {
        let mut config = sample();
        config.outputfiles.transcribernotefield = None;
        assert!(config.validate().is_err());

        config.outputfiles.transcribernote.clear();
        assert!(config.validate().is_err());

        config.outputfiles.transcribernote_appendfilenames = false;
        config.outputfiles.add_date_to_note = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_note_without_text_still_lists_files_and_date() {
        let mut config = sample();
        config.outputfiles.transcribernote.clear();

        let note = config.transcriber_note(today());
        assert_eq!(note, " known/finland.csv, known/sweden.csv (2024-05-17)");

        let settings = config.engine_settings_on(today()).unwrap();
        assert_eq!(settings.merge.active_note_column(), Some("Notes"));
        assert_eq!(settings.merge.note_text, note);
    }

    #[test]
    fn test_output_formats() {
        assert_eq!(OutputFormat::parse(" CSV ").unwrap(), OutputFormat::Csv);
        assert_eq!(OutputFormat::parse("xlsx").unwrap(), OutputFormat::Xlsx);
        assert_eq!(OutputFormat::parse("Fast-XLSX").unwrap(), OutputFormat::FastXlsx);
        assert_eq!(OutputFormat::FastXlsx.extension(), "xlsx");
        assert_eq!(OutputFormat::FastXlsx.to_string(), "FAST-XLSX");
        assert!(!OutputFormat::Csv.is_workbook());
    }

    #[test]
    fn test_unknown_output_format() {
        let mut config = sample();
        config.outputfiles.output_format = "ods".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { ref format } if format == "ODS"));
    }

    #[test]
    fn test_missing_reference_files() {
        let mut config = sample();
        config.knowndatafiles.filenames.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_pattern_fails_settings() {
        let mut config = sample();
        config
            .inputfiles
            .replacements
            .insert("(unclosed".to_string(), toml::Value::String("x".to_string()));
        assert!(matches!(
            config.engine_settings_on(today()),
            Err(Error::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", SAMPLE).unwrap();
        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.knowndatafiles.filenames.len(), 2);
    }

    #[test]
    fn test_load_errors() {
        assert!(matches!(
            Config::load(Path::new("/nonexistent/config.toml")),
            Err(Error::FileNotFound { .. })
        ));

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "[knowndatafiles]\nfirst_data_line = \"four\"\n").unwrap();
        assert!(matches!(
            Config::load(temp_file.path()),
            Err(Error::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_default_config_path_names_application() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("georef-processor/config.toml"));
        }
    }
}
