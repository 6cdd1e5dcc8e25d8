//! Free-form statement execution and paginated table browsing.

use log::{debug, warn};
use rusqlite::{Connection, params};
use std::time::Instant;

use super::database::Database;
use super::metadata::count_rows;
use super::tools::quote_ident;
use crate::utils::config::READ_ONLY_KEYWORDS;
use crate::{CellValue, QueryResult, Result, SortOrder, TablePage};

/// How a free-form statement is executed: read path or write-then-flush path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatementKind {
    ReadOnly,
    Mutating,
}

/// Classify by leading keyword: `SELECT`, `PRAGMA`, `EXPLAIN` or `WITH` (any case) are
/// read-only, everything else mutates.
///
/// Prefix heuristic only. Known misses: `WITH ... DELETE` and assigning `PRAGMA`s are
/// treated as read-only. Multi-statement text on the read path is refused by the engine
/// with [`rusqlite::Error::MultipleStatement`]; on the write path it runs as a batch.
pub fn classify_statement(sql: &str) -> StatementKind {
    let word: String = sql
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if READ_ONLY_KEYWORDS
        .iter()
        .any(|k| word.eq_ignore_ascii_case(k))
    {
        StatementKind::ReadOnly
    } else {
        StatementKind::Mutating
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Run a row-returning statement and materialize all rows.
fn run_select<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> rusqlite::Result<(Vec<String>, Vec<Vec<CellValue>>)> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let n = columns.len();
    let mut rows = stmt.query(params)?;
    let mut values = Vec::new();
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(n);
        for i in 0..n {
            cells.push(CellValue::from(row.get_ref(i)?));
        }
        values.push(cells);
    }
    Ok((columns, values))
}

impl Database {
    /// Execute one statement typed by the user.
    ///
    /// Read-only statements return their rows with `rows_affected = 0`. Anything else is run
    /// for effect, reports the engine's change count, and is flushed before returning.
    /// Engine errors are returned unchanged.
    pub fn execute_query(&mut self, sql: &str) -> Result<QueryResult> {
        let trimmed = sql.trim();
        let kind = classify_statement(trimmed);
        debug!("execute {:?}: {}", kind, trimmed);

        match kind {
            StatementKind::ReadOnly => {
                let conn = self.conn()?;
                let start = Instant::now();
                let (columns, values) = run_select(conn, trimmed, [])?;
                Ok(QueryResult {
                    columns,
                    values,
                    rows_affected: 0,
                    time: elapsed_ms(start),
                })
            }
            StatementKind::Mutating => {
                let conn = self.conn()?;
                let start = Instant::now();
                let outcome = conn.execute_batch(trimmed);
                let changes = conn.changes();
                let time = elapsed_ms(start);
                if let Err(e) = outcome {
                    // Earlier statements of a batch stay applied; keep disk in step with them.
                    if let Err(fe) = self.persist() {
                        warn!("flush after failed statement: {}", fe);
                    }
                    return Err(e.into());
                }
                self.persist()?;
                Ok(QueryResult {
                    columns: Vec::new(),
                    values: Vec::new(),
                    rows_affected: changes,
                    time,
                })
            }
        }
    }

    /// One zero-based page of `table`, prefixed with a `__rowid` column.
    ///
    /// `total_rows` is always the full count; a page past the end is simply empty.
    pub fn table_page(
        &self,
        table: &str,
        page: u64,
        page_size: u64,
        order_by: Option<&str>,
        order: SortOrder,
    ) -> Result<TablePage> {
        let conn = self.conn()?;
        let total_rows = count_rows(conn, table)?;

        let mut sql = format!("SELECT rowid AS __rowid, * FROM {}", quote_ident(table));
        if let Some(col) = order_by {
            sql.push_str(&format!(" ORDER BY {} {}", quote_ident(col), order.as_sql()));
        }
        sql.push_str(" LIMIT ?1 OFFSET ?2");

        let limit = i64::try_from(page_size).unwrap_or(i64::MAX);
        let offset = i64::try_from(page.saturating_mul(page_size)).unwrap_or(i64::MAX);
        let start = Instant::now();
        let (columns, values) = run_select(conn, &sql, params![limit, offset])?;
        Ok(TablePage {
            result: QueryResult {
                columns,
                values,
                rows_affected: 0,
                time: elapsed_ms(start),
            },
            total_rows,
            page,
            page_size,
        })
    }
}
