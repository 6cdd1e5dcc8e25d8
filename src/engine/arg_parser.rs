use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Browse, query, edit, and move data in and out of a SQLite file.
#[derive(Clone, Parser)]
#[command(name = "sqlity")]
#[command(about = "Browse, query, and edit a SQLite database file.")]
pub struct Cli {
    /// Database file to open.
    #[arg(value_name = "DB")]
    pub db: PathBuf,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Rows per page when browsing. Overrides `.sqlity.toml`.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub page_size: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// List tables and views with row counts.
    Tables,
    /// Show columns and indexes of a table.
    Describe { table: String },
    /// Print a reconstructed DDL script for the whole database.
    Schema,
    /// Run one statement; read-only statements print their rows.
    Query { sql: String },
    /// Show one page of a table.
    Browse {
        table: String,
        /// Zero-based page number.
        #[arg(long, default_value_t = 0)]
        page: u64,
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        page_size: Option<u64>,
        #[arg(long)]
        order_by: Option<String>,
        /// Sort descending (default ascending).
        #[arg(long)]
        desc: bool,
    },
    /// Write a table as CSV or JSON. Default output: `<TABLE>.<format>` in the current directory.
    Export {
        table: String,
        #[arg(long, value_enum, default_value_t = FormatArg::Csv)]
        format: FormatArg,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Append rows from a CSV or JSON file. Format defaults from the file extension.
    Import {
        table: String,
        file: PathBuf,
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
    /// Insert one row given as a JSON object of column to value.
    Insert { table: String, json: String },
    /// Set one cell. VALUE is read as JSON when it parses, otherwise as text.
    Update {
        table: String,
        rowid: i64,
        column: String,
        value: String,
    },
    /// Delete rows by rowid.
    Delete {
        table: String,
        #[arg(required = true, num_args = 1..)]
        rowids: Vec<i64>,
    },
    /// Read newline-delimited JSON requests on stdin; write one JSON response per line.
    Serve,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Csv,
    Json,
}

impl FormatArg {
    pub fn extension(self) -> &'static str {
        match self {
            FormatArg::Csv => "csv",
            FormatArg::Json => "json",
        }
    }

    /// Guess from a file extension; anything but `.json` is CSV.
    pub fn from_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => FormatArg::Json,
            _ => FormatArg::Csv,
        }
    }
}
