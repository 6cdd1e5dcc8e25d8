//! Public types for the sqlity API and the message layer.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

/// Kind of schema object listed by [`Database::list_tables`](crate::Database::list_tables).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Table,
    View,
}

/// One table or view in the live image. Re-queried on every call; never cached.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TableKind,
    /// `COUNT(*)` at call time; 0 when counting failed (e.g. a broken view).
    pub row_count: i64,
}

/// One column as reported by `PRAGMA table_info`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub cid: i64,
    pub name: String,
    /// Declared type text, empty when the column was declared without one.
    #[serde(rename = "type")]
    pub declared_type: String,
    pub not_null: bool,
    /// Default expression exactly as stored in the schema.
    pub default_value: Option<String>,
    pub primary_key: bool,
    /// 1-based position within the primary key, 0 when not part of it.
    #[serde(skip)]
    pub pk_ordinal: i64,
}

/// One index on a table, columns in key order.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    pub name: String,
    pub unique: bool,
    pub columns: Vec<String>,
    /// `c` for CREATE INDEX, `u` for a UNIQUE constraint, `pk` for a PRIMARY KEY constraint.
    #[serde(skip)]
    pub origin: String,
}

impl IndexInfo {
    /// True for indexes SQLite created on its own to back a constraint.
    pub fn is_implicit(&self) -> bool {
        self.origin != "c"
    }
}

/// Result of [`Database::describe_table`](crate::Database::describe_table).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TableSchema {
    pub columns: Vec<ColumnInfo>,
    pub indexes: Vec<IndexInfo>,
}

/// A single SQLite cell. Serializes as JSON null, number or string; blobs as base64 text.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            CellValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a JSON value (used for JSON export and for re-coercion).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Null => serde_json::Value::Null,
            CellValue::Integer(i) => serde_json::Value::from(*i),
            CellValue::Real(r) => serde_json::Number::from_f64(*r)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            CellValue::Text(s) => serde_json::Value::String(s.clone()),
            CellValue::Blob(b) => serde_json::Value::String(BASE64.encode(b)),
        }
    }
}

/// Text form used by CSV export: NULL is the empty string.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Real(r) => write!(f, "{r}"),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Blob(b) => f.write_str(&BASE64.encode(b)),
        }
    }
}

impl From<ValueRef<'_>> for CellValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => CellValue::Null,
            ValueRef::Integer(i) => CellValue::Integer(i),
            ValueRef::Real(r) => CellValue::Real(r),
            ValueRef::Text(t) => CellValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => CellValue::Blob(b.to_vec()),
        }
    }
}

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Null => ToSqlOutput::Owned(Value::Null),
            CellValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            CellValue::Real(r) => ToSqlOutput::Owned(Value::Real(*r)),
            CellValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            CellValue::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Null => serializer.serialize_unit(),
            CellValue::Integer(i) => serializer.serialize_i64(*i),
            CellValue::Real(r) => serializer.serialize_f64(*r),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Blob(b) => serializer.serialize_str(&BASE64.encode(b)),
        }
    }
}

/// Output of a query or statement. `columns`/`values` are empty for mutating statements.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub values: Vec<Vec<CellValue>>,
    pub rows_affected: u64,
    /// Wall time of the engine call in milliseconds.
    pub time: f64,
}

/// One page of [`Database::table_page`](crate::Database::table_page). The first result column is `__rowid`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePage {
    pub result: QueryResult,
    pub total_rows: i64,
    pub page: u64,
    pub page_size: u64,
}

/// Direction for the optional browse ordering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Named query kept for the lifetime of a session.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedQuery {
    pub name: String,
    pub sql: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

/// One executed statement in the session history (most recent first).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub sql: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub row_count: usize,
    pub pinned: bool,
}

/// Options resolved from `.sqlity.toml` and CLI flags.
#[derive(Clone, Debug)]
pub struct Opts {
    pub db_path: PathBuf,
    pub page_size: u64,
    pub history_limit: usize,
    pub verbose: bool,
    /// Program and arguments used for AI assist, if configured.
    pub assist_command: Vec<String>,
    /// Whether the user allowed prompts and schema to be sent to the assist backend.
    pub assist_consent: bool,
}
