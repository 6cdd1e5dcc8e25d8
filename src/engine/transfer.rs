//! Whole-table CSV/JSON export and transactional import.

use log::debug;
use rusqlite::{Connection, params_from_iter};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::coerce::cast_value;
use super::crud::FALLBACK_TYPE;
use super::csv::{is_blank_row, parse_csv, write_row};
use super::database::Database;
use super::tools::{placeholders, quote_ident};
use crate::{CellValue, Error, Result};

impl Database {
    /// Entire table as CSV: header line, then one line per row, joined by `\n`.
    /// NULL is written as an empty field.
    pub fn export_csv(&self, table: &str) -> Result<String> {
        let (columns, rows) = self.select_all(table)?;
        let mut lines = Vec::with_capacity(rows.len() + 1);
        lines.push(write_row(&columns));
        for row in &rows {
            lines.push(write_row(row.iter().map(|c| c.to_string())));
        }
        Ok(lines.join("\n"))
    }

    /// Entire table as a pretty-printed JSON array of objects keyed by column name.
    pub fn export_json(&self, table: &str) -> Result<String> {
        let (columns, rows) = self.select_all(table)?;
        let records: Vec<Value> = rows
            .iter()
            .map(|row| {
                let obj: Map<String, Value> = columns
                    .iter()
                    .zip(row)
                    .map(|(col, cell)| (col.clone(), cell.to_json()))
                    .collect();
                Value::Object(obj)
            })
            .collect();
        serde_json::to_string_pretty(&records).map_err(|e| Error::Io(e.into()))
    }

    /// Import CSV whose first line names the target columns. Empty fields import as NULL.
    ///
    /// All rows are inserted in one transaction; the first failing row rolls back the
    /// whole batch. Returns the number of rows inserted (0 for input with no data lines).
    pub fn import_csv(&mut self, table: &str, text: &str) -> Result<usize> {
        let mut lines = parse_csv(text).into_iter();
        let Some(headers) = lines.next() else {
            return Ok(0);
        };
        let data: Vec<Vec<String>> = lines.filter(|r| !is_blank_row(r)).collect();
        if data.is_empty() {
            return Ok(0);
        }
        check_headers(&headers)?;
        for (i, row) in data.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(Error::ImportFormat(format!(
                    "line {} has {} fields, header has {}",
                    i + 2,
                    row.len(),
                    headers.len()
                )));
            }
        }

        let types = self.column_types(table)?;
        let rows: Vec<Vec<CellValue>> = data
            .into_iter()
            .map(|row| {
                headers
                    .iter()
                    .zip(row)
                    .map(|(h, field)| {
                        let raw = if field.is_empty() {
                            Value::Null
                        } else {
                            Value::String(field)
                        };
                        cast_value(&raw, declared(&types, h))
                    })
                    .collect()
            })
            .collect();
        self.import_rows(table, &headers, &rows)
    }

    /// Import a JSON array of flat objects. Columns come from the first object's keys;
    /// keys missing from later objects import as NULL.
    pub fn import_json(&mut self, table: &str, text: &str) -> Result<usize> {
        let parsed: Value =
            serde_json::from_str(text).map_err(|e| Error::ImportFormat(e.to_string()))?;
        let Value::Array(records) = parsed else {
            return Err(Error::ImportFormat("expected a JSON array of objects".into()));
        };
        let Some(first) = records.first() else {
            return Ok(0);
        };
        let Value::Object(first) = first else {
            return Err(Error::ImportFormat("record 1 is not an object".into()));
        };
        let headers: Vec<String> = first.keys().cloned().collect();
        check_headers(&headers)?;

        let types = self.column_types(table)?;
        let mut rows = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let Value::Object(obj) = record else {
                return Err(Error::ImportFormat(format!(
                    "record {} is not an object",
                    i + 1
                )));
            };
            rows.push(
                headers
                    .iter()
                    .map(|h| cast_value(obj.get(h).unwrap_or(&Value::Null), declared(&types, h)))
                    .collect(),
            );
        }
        self.import_rows(table, &headers, &rows)
    }

    fn select_all(&self, table: &str) -> Result<(Vec<String>, Vec<Vec<CellValue>>)> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote_ident(table)))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let n = columns.len();
        let rows = stmt
            .query_map([], |row| {
                (0..n)
                    .map(|i| row.get_ref(i).map(CellValue::from))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((columns, rows))
    }

    /// Insert `rows` in one transaction, then flush once.
    fn import_rows(
        &mut self,
        table: &str,
        headers: &[String],
        rows: &[Vec<CellValue>],
    ) -> Result<usize> {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            headers
                .iter()
                .map(|h| quote_ident(h))
                .collect::<Vec<_>>()
                .join(", "),
            placeholders(headers.len())
        );
        let imported = insert_batch(self.conn_mut()?, &sql, rows)?;
        self.persist()?;
        debug!("Imported {} rows into {}", imported, table);
        Ok(imported)
    }
}

fn declared<'a>(types: &'a HashMap<String, String>, column: &str) -> &'a str {
    types.get(column).map_or(FALLBACK_TYPE, String::as_str)
}

fn check_headers(headers: &[String]) -> Result<()> {
    if let Some(pos) = headers.iter().position(|h| h.trim().is_empty()) {
        return Err(Error::ImportFormat(format!(
            "header column {} is empty",
            pos + 1
        )));
    }
    Ok(())
}

/// Run the insert for every row inside a transaction. Any failure rolls everything back.
fn insert_batch(conn: &mut Connection, sql: &str, rows: &[Vec<CellValue>]) -> Result<usize> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(sql)?;
        for (i, row) in rows.iter().enumerate() {
            if let Err(source) = stmt.execute(params_from_iter(row.iter())) {
                drop(stmt);
                tx.rollback()?;
                return Err(Error::ImportBatch { row: i + 1, source });
            }
        }
    }
    tx.commit()?;
    Ok(rows.len())
}
