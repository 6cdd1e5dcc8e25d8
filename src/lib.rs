//! Sqlity: browse, query, edit, and import/export a SQLite file held as an in-memory image.
//!
//! Every mutation is written back to the file before the call returns.

pub mod assist;
pub mod engine;
pub mod error;
pub mod session;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use engine::Database;
pub use error::{Error, Result};
