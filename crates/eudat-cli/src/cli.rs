//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "eudat",
    version,
    about = "Harmonise national open datasets onto a common schema",
    long_about = "Harmonise heterogeneous national datasets onto the common schema of a category.\n\n\
                  Columns are matched to canonical fields through metadata hints and translated\n\
                  labels, records are located from coordinates or geocoded addresses, and the\n\
                  result is written as CSV, JSON records or GeoJSON."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Harmonise one dataset.
    Harmonize(HarmonizeArgs),

    /// List supported languages.
    Languages,

    /// List supported countries.
    Countries,
}

#[derive(Parser)]
pub struct HarmonizeArgs {
    /// Dataset to harmonise (CSV or JSON records).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Harmoniser configuration of the category.
    #[arg(long = "config", value_name = "FILE")]
    pub config: PathBuf,

    /// Metadata document of the dataset.
    #[arg(long = "meta", value_name = "FILE")]
    pub meta: PathBuf,

    /// Output file (default: <INPUT stem>.harmonized.<format>).
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format; guessed from the output extension when omitted.
    #[arg(long = "format", value_enum)]
    pub format: Option<OutputFormatArg>,

    /// CSV delimiter of the input; sniffed from the header when omitted.
    #[arg(long = "delimiter", value_name = "CHAR")]
    pub delimiter: Option<char>,

    /// Offline glossary used to translate column labels.
    #[arg(long = "glossary", value_name = "FILE")]
    pub glossary: Option<PathBuf>,

    /// Output language of column labels.
    #[arg(long = "olang", value_name = "LANG")]
    pub olang: Option<String>,

    /// Coordinate order of combined coordinate columns (lL or Ll).
    #[arg(long = "order", value_name = "ORDER")]
    pub order: Option<String>,

    /// Columns to keep: all, resolved, or a comma-separated list.
    #[arg(long = "keep", value_name = "KEEP", default_value = "all")]
    pub keep: String,

    /// Keep unresolved fields as empty columns.
    #[arg(long = "force")]
    pub force: bool,

    /// Resolve coordinates before formatting.
    #[arg(long = "locate")]
    pub locate: bool,

    /// Write the updated metadata document to this file.
    #[arg(long = "snapshot", value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Datetime format of the source values.
    #[arg(long = "dtfmt-in", value_name = "FORMAT")]
    pub dtfmt_in: Option<String>,

    /// Datetime format of the output values.
    #[arg(long = "dtfmt-out", value_name = "FORMAT")]
    pub dtfmt_out: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormatArg {
    Csv,
    Json,
    Geojson,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
