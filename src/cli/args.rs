//! Command-line argument definitions for the georeferencing processor
//!
//! This module defines the CLI interface using the clap derive API.

use crate::config::default_config_path;
use crate::{Error, Result};
use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the georeferencing processor
///
/// Matches each row of the input files against the configured known-data
/// reference tables and writes a georeferenced copy of every input file.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "georef_processor",
    version,
    about = "Georeference locality records in tabular files against known-data reference tables",
    long_about = "Matches every row of the input files against known-data reference tables \
                  (gazetteers) using per-column rules defined in the reference table headers, \
                  then merges the single matching reference row into the output. Rows with no \
                  match or with several matches are copied unchanged. Input files are never \
                  modified; each output file is written next to its input."
)]
pub struct Args {
    /// Input files to georeference
    ///
    /// Glob patterns (e.g. `data/*.csv`) are expanded for shells that do
    /// not expand them.
    #[arg(value_name = "INPUT_FILES", required = true, num_args = 1..)]
    pub inputs: Vec<String>,

    /// Path to configuration file
    ///
    /// TOML configuration file. If not specified, looks for
    /// georef-processor/config.toml in the user configuration directory.
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    pub config_file: Option<PathBuf>,

    /// Also write log messages to this file
    #[arg(
        long = "log-file",
        value_name = "FILE",
        help = "Append log messages to a file"
    )]
    pub log_file: Option<PathBuf>,

    /// Perform a dry run without writing output files
    ///
    /// Loads the configuration and reference tables, reports the parsed
    /// rules and the planned output files, and exits.
    #[arg(
        long = "dry-run",
        help = "Show what would be processed without creating output files"
    )]
    pub dry_run: bool,

    /// Disable the progress bar
    #[arg(long = "no-progress", help = "Disable the progress bar")]
    pub no_progress: bool,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    ///
    /// Only show errors. Overrides verbose settings.
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl Args {
    /// Configuration file to use: `--config` or the default location
    ///
    /// # Errors
    /// * `Error::Configuration` if neither is available
    pub fn config_path(&self) -> Result<PathBuf> {
        self.config_file
            .clone()
            .or_else(default_config_path)
            .ok_or_else(|| {
                Error::configuration(
                    "No configuration file given and no user configuration directory found",
                )
            })
    }

    /// Expand the input arguments into file paths, keeping argument order
    ///
    /// Arguments without glob characters are used as given. Duplicates are
    /// dropped.
    ///
    /// # Errors
    /// * `Error::Configuration` for an invalid glob pattern
    /// * `Error::FileNotFound` if a pattern matches no file
    pub fn expand_inputs(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = Vec::new();

        for input in &self.inputs {
            let expanded: Vec<PathBuf> = if is_glob_pattern(input) {
                let paths = glob::glob(input).map_err(|e| {
                    Error::configuration(format!("Invalid glob pattern '{}': {}", input, e))
                })?;
                let matched: Vec<PathBuf> = paths
                    .filter_map(|entry| entry.ok())
                    .filter(|path| path.is_file())
                    .collect();
                if matched.is_empty() {
                    return Err(Error::file_not_found(input.clone()));
                }
                matched
            } else {
                vec![PathBuf::from(input)]
            };

            for path in expanded {
                if !files.contains(&path) {
                    files.push(path);
                }
            }
        }

        Ok(files)
    }

    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 | 1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress bars
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.no_progress
    }
}

fn is_glob_pattern(value: &str) -> bool {
    value.contains(['*', '?', '['])
}
