//! Database engine adapter: image lifecycle, catalog, queries, edits, and import/export.

pub mod arg_parser;
pub mod coerce;
pub mod crud;
pub mod csv;
pub mod database;
pub mod handlers;
pub mod metadata;
pub mod query;
pub mod tools;
pub mod transfer;

// Re-export commonly used functions
pub use arg_parser::{Cli, Commands};
pub use coerce::{COERCION_RULES, CoercionRule, cast_value};
pub use csv::{escape_field, parse_csv, write_row};
pub use database::{Database, backup_to_file};
pub use handlers::{handle_run, serve};
pub use query::{StatementKind, classify_statement};
pub use tools::{format_count, quote_ident};
