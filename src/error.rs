//! Error taxonomy for database, import and assist operations.

use std::path::PathBuf;

/// Result alias used by the public sqlity API.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Operation attempted before open or after close.
    #[error("database is not open")]
    NotOpen,

    /// Plain filesystem failure (reading or writing a file outside SQLite).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The file could not be loaded as a database image.
    #[error("cannot open database {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Writing the database image back to its file failed.
    #[error("cannot write database {}: {source}", path.display())]
    Flush {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The engine rejected a statement. Message is the engine's own.
    #[error(transparent)]
    Sql(#[from] rusqlite::Error),

    /// CSV/JSON import input is malformed or has an unusable header.
    #[error("invalid import data: {0}")]
    ImportFormat(String),

    /// A row failed during a transactional import; the whole batch was rolled back.
    #[error("import failed at row {row}, no rows were imported: {source}")]
    ImportBatch {
        row: usize,
        #[source]
        source: rusqlite::Error,
    },

    /// No language model backend is reachable.
    #[error("AI assist unavailable: {0}")]
    AssistUnavailable(String),

    /// The caller has not consented to language model use.
    #[error("AI assist not permitted: {0}")]
    AssistPermission(String),
}

impl Error {
    /// Machine-readable code for transport-level error payloads.
    pub fn error_code(&self) -> String {
        match self {
            Error::NotOpen => "NOT_OPEN".to_string(),
            Error::Io(_) | Error::Open { .. } | Error::Flush { .. } => "IO_ERROR".to_string(),
            Error::Sql(e) => sqlite_code_name(e).to_string(),
            Error::ImportFormat(_) => "IMPORT_FORMAT".to_string(),
            Error::ImportBatch { .. } => "IMPORT_BATCH".to_string(),
            Error::AssistUnavailable(_) => "ASSIST_UNAVAILABLE".to_string(),
            Error::AssistPermission(_) => "ASSIST_PERMISSION".to_string(),
        }
    }
}

fn sqlite_code_name(e: &rusqlite::Error) -> &'static str {
    use rusqlite::ErrorCode;
    match e.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => "SQLITE_CONSTRAINT",
        Some(ErrorCode::TypeMismatch) => "SQLITE_MISMATCH",
        Some(ErrorCode::ReadOnly) => "SQLITE_READONLY",
        Some(ErrorCode::DatabaseBusy) => "SQLITE_BUSY",
        Some(ErrorCode::DatabaseLocked) => "SQLITE_LOCKED",
        Some(ErrorCode::NotADatabase) => "SQLITE_NOTADB",
        Some(ErrorCode::TooBig) => "SQLITE_TOOBIG",
        Some(_) => "SQLITE_ERROR",
        None => "SQL_ERROR",
    }
}
