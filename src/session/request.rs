//! Closed message types between a UI and the core, one request variant per operation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    ColumnInfo, Error, HistoryEntry, IndexInfo, QueryResult, SavedQuery, SortOrder, TableInfo,
    TablePage,
};

/// Export/import payload format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Csv,
    Json,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    GetTables,
    GetSchema {
        table: String,
    },
    GetSchemaSql,
    ExecuteQuery {
        sql: String,
    },
    GetTableData {
        table: String,
        page: u64,
        page_size: u64,
        #[serde(default)]
        order_by: Option<String>,
        #[serde(default)]
        order_dir: SortOrder,
    },
    UpdateRow {
        table: String,
        rowid: i64,
        column: String,
        value: Value,
    },
    InsertRow {
        table: String,
        values: Map<String, Value>,
    },
    DeleteRows {
        table: String,
        rowids: Vec<i64>,
    },
    Export {
        table: String,
        format: DataFormat,
    },
    Import {
        table: String,
        format: DataFormat,
        data: String,
    },
    SaveQuery {
        name: String,
        sql: String,
    },
    GetSavedQueries,
    DeleteSavedQuery {
        name: String,
    },
    GetHistory,
    PinResult {
        id: String,
    },
    AiAssist {
        prompt: String,
    },
    AiExecute {
        sql: String,
        msg_id: String,
    },
    Refresh,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Response {
    Tables {
        tables: Vec<TableInfo>,
    },
    Schema {
        table: String,
        columns: Vec<ColumnInfo>,
        indexes: Vec<IndexInfo>,
    },
    SchemaSql {
        sql: String,
    },
    QueryResult {
        result: QueryResult,
        sql: String,
    },
    TableData {
        table: String,
        #[serde(flatten)]
        page: TablePage,
    },
    Info {
        message: String,
    },
    Exported {
        table: String,
        format: DataFormat,
        data: String,
    },
    Imported {
        table: String,
        count: usize,
    },
    SavedQueries {
        queries: Vec<SavedQuery>,
    },
    History {
        entries: Vec<HistoryEntry>,
    },
    AiResult {
        prompt: String,
        sql: String,
    },
    AiQueryResult {
        msg_id: String,
        result: QueryResult,
        sql: String,
    },
    Error {
        message: String,
        code: String,
    },
}

impl From<&Error> for Response {
    fn from(e: &Error) -> Self {
        Response::Error {
            message: e.to_string(),
            code: e.error_code(),
        }
    }
}
