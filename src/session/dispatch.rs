//! Route one decoded [`Request`] to the database and session state.

use log::debug;

use super::request::{DataFormat, Request, Response};
use super::state::SessionState;
use crate::assist::{SqlGenerator, generate_sql};
use crate::{Database, Error, Result};

/// Everything one request may touch: the open file, its session state, and the assist backend.
pub struct Session<'a> {
    pub db: &'a mut Database,
    pub state: &'a mut SessionState,
    pub assist: Option<&'a dyn SqlGenerator>,
}

impl Session<'_> {
    /// Handle `request`, turning any failure into a [`Response::Error`].
    pub fn handle(&mut self, request: Request) -> Response {
        match self.dispatch(request) {
            Ok(resp) => resp,
            Err(e) => {
                debug!("request failed: {}", e);
                Response::from(&e)
            }
        }
    }

    /// Decode one JSON request line and handle it. Malformed input yields a `BAD_REQUEST` error response.
    pub fn handle_line(&mut self, line: &str) -> Response {
        match serde_json::from_str::<Request>(line) {
            Ok(request) => self.handle(request),
            Err(e) => Response::Error {
                message: format!("invalid request: {e}"),
                code: "BAD_REQUEST".to_string(),
            },
        }
    }

    /// Handle `request`, propagating failures to the caller.
    pub fn dispatch(&mut self, request: Request) -> Result<Response> {
        Ok(match request {
            Request::GetTables | Request::Refresh => Response::Tables {
                tables: self.db.list_tables()?,
            },
            Request::GetSchema { table } => {
                let schema = self.db.describe_table(&table)?;
                Response::Schema {
                    table,
                    columns: schema.columns,
                    indexes: schema.indexes,
                }
            }
            Request::GetSchemaSql => Response::SchemaSql {
                sql: self.db.schema_sql()?,
            },
            Request::ExecuteQuery { sql } => {
                let result = self.run_and_record(&sql)?;
                Response::QueryResult { result, sql }
            }
            Request::GetTableData {
                table,
                page,
                page_size,
                order_by,
                order_dir,
            } => {
                let page = self
                    .db
                    .table_page(&table, page, page_size, order_by.as_deref(), order_dir)?;
                Response::TableData { table, page }
            }
            Request::UpdateRow {
                table,
                rowid,
                column,
                value,
            } => {
                self.db.update_row(&table, rowid, &column, &value)?;
                info("Row updated.")
            }
            Request::InsertRow { table, values } => {
                self.db.insert_row(&table, &values)?;
                info("Row inserted.")
            }
            Request::DeleteRows { table, rowids } => {
                let n = self.db.delete_rows(&table, &rowids)?;
                info(&format!("{n} row(s) deleted."))
            }
            Request::Export { table, format } => {
                let data = match format {
                    DataFormat::Csv => self.db.export_csv(&table)?,
                    DataFormat::Json => self.db.export_json(&table)?,
                };
                Response::Exported {
                    table,
                    format,
                    data,
                }
            }
            Request::Import {
                table,
                format,
                data,
            } => {
                let count = match format {
                    DataFormat::Csv => self.db.import_csv(&table, &data)?,
                    DataFormat::Json => self.db.import_json(&table, &data)?,
                };
                Response::Imported { table, count }
            }
            Request::SaveQuery { name, sql } => {
                self.state.save_query(&name, &sql);
                self.saved_queries()
            }
            Request::GetSavedQueries => self.saved_queries(),
            Request::DeleteSavedQuery { name } => {
                self.state.delete_saved_query(&name);
                self.saved_queries()
            }
            Request::GetHistory => self.history(),
            Request::PinResult { id } => {
                self.state.toggle_pin(&id);
                self.history()
            }
            Request::AiAssist { prompt } => {
                let generator = self.assist.ok_or_else(|| {
                    Error::AssistUnavailable("no assist backend configured".to_string())
                })?;
                let schema = self.db.schema_sql()?;
                let sql = generate_sql(generator, &prompt, &schema)?;
                Response::AiResult { prompt, sql }
            }
            Request::AiExecute { sql, msg_id } => {
                let result = self.run_and_record(&sql)?;
                Response::AiQueryResult {
                    msg_id,
                    result,
                    sql,
                }
            }
        })
    }

    fn run_and_record(&mut self, sql: &str) -> Result<crate::QueryResult> {
        let result = self.db.execute_query(sql)?;
        self.state.record_history(sql, result.values.len());
        Ok(result)
    }

    fn saved_queries(&self) -> Response {
        Response::SavedQueries {
            queries: self.state.saved_queries().to_vec(),
        }
    }

    fn history(&self) -> Response {
        Response::History {
            entries: self.state.history().to_vec(),
        }
    }
}

fn info(message: &str) -> Response {
    Response::Info {
        message: message.to_string(),
    }
}
