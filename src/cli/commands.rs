//! Command implementations for the georeferencing processor CLI
//!
//! This module contains the main command execution logic, progress reporting,
//! and the final summary.

use crate::app::adapters::files::{create_sink, read_table};
use crate::app::adapters::tabular::TabularSource;
use crate::app::services::reference_table::ReferenceTable;
use crate::app::services::row_processor::{FileStats, RowProcessor};
use crate::cli::args::Args;
use crate::config::{Config, EngineSettings, OutputFormat};
use crate::constants::rule_tokens;
use anyhow::{Context, Result};
use colored::*;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Statistics for a whole run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Number of input files processed
    pub files_processed: usize,
    /// Row counts summed over all files
    pub rows: FileStats,
    /// Output files written (planned files in a dry run)
    pub output_files: Vec<PathBuf>,
    /// Total processing time
    pub processing_time: Duration,
}

impl RunStats {
    /// Add the result of one processed file
    pub fn record_file(&mut self, output: PathBuf, stats: &FileStats) {
        self.files_processed += 1;
        self.rows.accumulate(stats);
        self.output_files.push(output);
    }
}

/// Main command runner
///
/// Sets up logging, then runs [`execute`].
pub fn run(args: Args) -> Result<RunStats> {
    setup_logging(&args)?;
    execute(&args)
}

/// Run the georeferencing workflow:
/// 1. Load and validate the configuration
/// 2. Load the reference tables and parse their rules
/// 3. Georeference every input file into a new output file
/// 4. Print a summary
pub fn execute(args: &Args) -> Result<RunStats> {
    let start_time = Instant::now();
    info!("Starting georef_processor {}", env!("CARGO_PKG_VERSION"));
    debug!("Command line arguments: {:?}", args);

    let config_path = args.config_path()?;
    info!("Reading configuration file {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration {}", config_path.display()))?;
    let settings = config
        .engine_settings()
        .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;
    let format = config.output_format()?;
    let delimiter = config.delimiter()?;
    log_settings(&config, &settings, format);

    let inputs = args.expand_inputs()?;
    let tables = load_reference_tables(&config, &settings, delimiter)?;

    if args.dry_run {
        return run_dry_run(&config, &inputs, format);
    }

    let processor = RowProcessor::new(&tables, &settings);
    let mut stats = RunStats::default();

    for input in &inputs {
        let output = output_path(input, &config.outputfiles.filename_add, format);
        let target = OutputTarget {
            path: &output,
            format,
            delimiter,
            sheet: config.inputfiles.sheetname.as_deref(),
        };
        let file_stats = process_file(&processor, input, &target, args.show_progress())
            .with_context(|| format!("Failed to process {}", input.display()))?;
        stats.record_file(output, &file_stats);
    }

    stats.processing_time = start_time.elapsed();
    if !args.quiet {
        print_summary(&stats);
    }
    Ok(stats)
}

/// Set up structured logging based on CLI arguments
fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("georef_processor={}", log_level)));

    let file_layer = match &args.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
            .context("Failed to initialize logging")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
            .context("Failed to initialize logging")?;
    }

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

fn log_settings(config: &Config, settings: &EngineSettings, format: OutputFormat) {
    info!("Output format: {}", format);
    if let Some(sheet) = &config.inputfiles.sheetname {
        info!("Input worksheet: {}", sheet);
    }
    if let Some(sheet) = &config.knowndatafiles.sheetname {
        info!("Reference worksheet: {}", sheet);
    }
    if !settings.skip_if_nonempty.is_empty() {
        debug!(
            "Skipping rows with content in columns {:?}",
            settings.skip_if_nonempty
        );
    }
    debug!(
        "Normalization: {} substitutions, ignored characters '{}'",
        settings.normalizer.substitution_count(),
        settings.normalizer.ignore_chars()
    );
    if !settings.merge.note_text.is_empty() {
        debug!("Transcriber note: {}", settings.merge.note_text);
    }
}

/// Load every configured reference table and log its rules
fn load_reference_tables(
    config: &Config,
    settings: &EngineSettings,
    delimiter: u8,
) -> Result<Vec<ReferenceTable>> {
    config
        .knowndatafiles
        .filenames
        .iter()
        .map(|path| {
            let table = ReferenceTable::load(
                path,
                config.knowndatafiles.sheetname.as_deref(),
                delimiter,
                settings.reference_first_data_line,
                rule_tokens::KNOWN,
            )
            .with_context(|| format!("Failed to load reference data {}", path.display()))?;

            for rule in table.rules() {
                info!(
                    "Rule for column {}, rule type '{}'",
                    rule.column_name(),
                    rule.rule_type()
                );
            }
            if table.rules().is_empty() {
                warn!("No matching rules in {}; no row can match", path.display());
            }
            info!(
                "Loaded {} reference rows from {}",
                table.data_row_count(),
                path.display()
            );
            Ok(table)
        })
        .collect()
}

/// Output file name: `<stem>.<marker>.<extension>` next to the input
pub fn output_path(input: &Path, marker: &str, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}.{}.{}", stem, marker.trim(), format.extension()))
}

/// Where and how one output file is written
struct OutputTarget<'a> {
    path: &'a Path,
    format: OutputFormat,
    delimiter: u8,
    /// Worksheet to read from a workbook input, also the output worksheet name
    sheet: Option<&'a str>,
}

/// Georeference one input file into a new output file
///
/// A partially written output file is removed when processing fails.
fn process_file(
    processor: &RowProcessor<'_>,
    input: &Path,
    target: &OutputTarget<'_>,
    show_progress: bool,
) -> Result<FileStats> {
    info!("Processing file {}", input.display());
    let source = read_table(input, target.sheet, target.delimiter)?;
    let mut sink = create_sink(
        target.path,
        source.column_names(),
        target.format,
        target.delimiter,
        target.sheet,
    )?;

    let progress = show_progress.then(|| row_progress_bar(source.row_count(), input));
    let result = processor.process_file(&source, sink.as_mut(), |_| {
        if let Some(pb) = &progress {
            pb.inc(1);
        }
    });
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    drop(sink);

    let output = target.path;
    match result {
        Ok(stats) => {
            info!("Saved output file {}", output.display());
            Ok(stats)
        }
        Err(e) => {
            if let Err(remove_err) = std::fs::remove_file(output) {
                warn!(
                    "Failed to remove incomplete output {}: {}",
                    output.display(),
                    remove_err
                );
            }
            Err(e.into())
        }
    }
}

/// Progress bar over the data rows of a table with `row_count` rows
fn row_progress_bar(row_count: usize, input: &Path) -> ProgressBar {
    let pb = ProgressBar::new(row_count.saturating_sub(1) as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows {msg}")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message(
        input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    pb
}

/// Perform a dry run showing what would be processed
fn run_dry_run(config: &Config, inputs: &[PathBuf], format: OutputFormat) -> Result<RunStats> {
    info!("Performing dry run - no files will be created");

    let mut stats = RunStats::default();
    for input in inputs {
        let output = output_path(input, &config.outputfiles.filename_add, format);
        if !input.is_file() {
            warn!("Input file does not exist: {}", input.display());
        } else if output.exists() {
            warn!("Output file {} exists and would not be overwritten", output.display());
        } else {
            info!("Would create: {}", output.display());
        }
        stats.output_files.push(output);
    }

    info!(
        "Dry run complete: {} input files would be processed",
        stats.output_files.len()
    );
    Ok(stats)
}

/// Print the final summary
fn print_summary(stats: &RunStats) {
    let rows = &stats.rows;

    println!("\n{}", "Georeferencing Summary".bright_green().bold());
    println!(
        "  {} {}",
        "Time elapsed:".bright_cyan(),
        HumanDuration(stats.processing_time).to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Files processed:".bright_cyan(),
        stats.files_processed.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Data rows:".bright_cyan(),
        rows.data_rows().to_string().bright_white().bold()
    );
    println!(
        "  {} {} ({:.1}%)",
        "Rows georeferenced:".bright_cyan(),
        rows.merged.to_string().bright_green().bold(),
        rows.merge_rate()
    );
    println!(
        "  {} {}",
        "No match:".bright_cyan(),
        rows.no_match.to_string().bright_white()
    );
    if rows.ambiguous > 0 {
        println!(
            "  {} {}",
            "Ambiguous matches:".bright_yellow(),
            rows.ambiguous.to_string().bright_yellow().bold()
        );
    }
    println!(
        "  {} {}",
        "Skipped:".bright_cyan(),
        rows.skipped.to_string().bright_white()
    );
    if rows.unmatchable > 0 {
        println!(
            "  {} {}",
            "Unparseable dates:".bright_red(),
            rows.unmatchable.to_string().bright_red().bold()
        );
    }

    if !stats.output_files.is_empty() {
        println!("\n{}", "Output files:".bright_green());
        for path in &stats.output_files {
            println!("  {}", path.display());
        }
    }
    println!();
}
