//! Single-row edits addressed by rowid. Each call flushes the image before returning.

use log::{debug, warn};
use rusqlite::params_from_iter;
use serde_json::{Map, Value};

use super::coerce::cast_value;
use super::database::Database;
use super::tools::{placeholders, quote_ident};
use crate::{CellValue, Result};

/// Declared type assumed for columns the schema does not know.
pub(crate) const FALLBACK_TYPE: &str = "TEXT";

impl Database {
    /// Set `column` of the row with `rowid` to `value`, coerced to the column's declared type.
    /// Returns the number of rows changed (0 when no row has that rowid).
    pub fn update_row(
        &mut self,
        table: &str,
        rowid: i64,
        column: &str,
        value: &Value,
    ) -> Result<u64> {
        let types = self.column_types(table)?;
        let declared = types.get(column).map_or(FALLBACK_TYPE, String::as_str);
        let cell = cast_value(value, declared);

        let sql = format!(
            "UPDATE {} SET {} = ?1 WHERE rowid = ?2",
            quote_ident(table),
            quote_ident(column)
        );
        let changed = self.conn()?.execute(&sql, rusqlite::params![cell, rowid])?;
        self.persist()?;
        Ok(changed as u64)
    }

    /// Insert one row with exactly the supplied columns; others take their schema defaults.
    /// Returns the new row's rowid.
    pub fn insert_row(&mut self, table: &str, values: &Map<String, Value>) -> Result<i64> {
        let types = self.column_types(table)?;
        let conn = self.conn()?;

        if values.is_empty() {
            conn.execute(
                &format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table)),
                [],
            )?;
        } else {
            let columns: Vec<String> = values.keys().map(|c| quote_ident(c)).collect();
            let cells: Vec<CellValue> = values
                .iter()
                .map(|(col, raw)| {
                    cast_value(raw, types.get(col).map_or(FALLBACK_TYPE, String::as_str))
                })
                .collect();
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(table),
                columns.join(", "),
                placeholders(cells.len())
            );
            conn.execute(&sql, params_from_iter(cells.iter()))?;
        }
        let rowid = conn.last_insert_rowid();
        self.persist()?;
        debug!("Inserted rowid {} into {}", rowid, table);
        Ok(rowid)
    }

    /// Delete all rows whose rowid is in `rowids`, in one statement.
    /// An empty list changes nothing and skips the flush.
    pub fn delete_rows(&mut self, table: &str, rowids: &[i64]) -> Result<u64> {
        if rowids.is_empty() {
            warn!("delete_rows on {} called with no rowids", table);
            return Ok(0);
        }
        let sql = format!(
            "DELETE FROM {} WHERE rowid IN ({})",
            quote_ident(table),
            placeholders(rowids.len())
        );
        let deleted = self
            .conn()?
            .execute(&sql, params_from_iter(rowids.iter()))?;
        self.persist()?;
        Ok(deleted as u64)
    }
}
