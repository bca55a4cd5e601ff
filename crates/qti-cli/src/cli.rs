//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "qti-export",
    version,
    about = "Export question bank records as a QTI 2.1 content package",
    long_about = "Export question bank records as a QTI 2.1 content package.\n\n\
                  Supports multiple-choice, true/false, short-answer, numerical and\n\
                  embedded-answer questions. Items carry Inspera extensions."
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
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Export questions into a zip archive.
    Export(ExportArgs),

    /// List questions and whether they can be exported.
    Inspect(InspectArgs),
}

#[derive(Parser)]
pub struct ExportArgs {
    /// Question documents (JSON array or object with a `questions` array).
    #[arg(value_name = "QUESTIONS.json", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Root of the file store holding embedded files.
    #[arg(long = "assets", value_name = "DIR")]
    pub assets: PathBuf,

    /// Directory receiving the archive.
    #[arg(long = "output", value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// Address of the source site; scopes every generated identifier.
    #[arg(long = "site-url", value_name = "URL")]
    pub site_url: Option<String>,

    /// File name of the archive (default: qti-export.zip).
    #[arg(long = "archive-name", value_name = "NAME")]
    pub archive_name: Option<String>,

    /// Vendor default language of item bodies (default: en_us).
    #[arg(long = "language", value_name = "TAG")]
    pub language: Option<String>,

    /// Configuration file (default: ./qti-export.toml when present).
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Parser)]
pub struct InspectArgs {
    /// Question documents.
    #[arg(value_name = "QUESTIONS.json", required = true)]
    pub inputs: Vec<PathBuf>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
