//! Catalog introspection and schema DDL synthesis.

use log::warn;
use rusqlite::Connection;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use super::database::Database;
use super::tools::{ddl_ident, format_count, quote_ident};
use crate::{ColumnInfo, IndexInfo, Result, TableInfo, TableKind, TableSchema};

const LIST_TABLES_SQL: &str = "SELECT name, type FROM sqlite_master \
     WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' \
     ORDER BY name";

/// One row of `PRAGMA foreign_key_list`, grouped later by constraint id.
struct ForeignKeyPart {
    id: i64,
    parent_table: String,
    from: String,
    to: Option<String>,
}

impl Database {
    /// Tables and views ordered by name, each with a live row count.
    ///
    /// A count that fails (e.g. a view over a dropped table) is reported as 0 instead of
    /// failing the whole listing.
    pub fn list_tables(&self) -> Result<Vec<TableInfo>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(LIST_TABLES_SQL)?;
        let objects = stmt
            .query_map([], |row| {
                let name: String = row.get(0)?;
                let kind: String = row.get(1)?;
                Ok((name, kind))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(objects
            .into_iter()
            .map(|(name, kind)| {
                let row_count = count_rows(conn, &name).unwrap_or_else(|e| {
                    warn!("COUNT(*) on {} failed, reporting 0: {}", name, e);
                    0
                });
                TableInfo {
                    name,
                    kind: if kind == "view" {
                        TableKind::View
                    } else {
                        TableKind::Table
                    },
                    row_count,
                }
            })
            .collect())
    }

    /// Columns and indexes of `table`. An unknown table yields an empty schema.
    pub fn describe_table(&self, table: &str) -> Result<TableSchema> {
        let conn = self.conn()?;
        Ok(TableSchema {
            columns: table_columns(conn, table)?,
            indexes: table_indexes(conn, table)?,
        })
    }

    /// Declared type per column name for `table`.
    pub(crate) fn column_types(&self, table: &str) -> Result<HashMap<String, String>> {
        let conn = self.conn()?;
        Ok(table_columns(conn, table)?
            .into_iter()
            .map(|c| (c.name, c.declared_type))
            .collect())
    }

    /// Generate a `CREATE TABLE`/`CREATE INDEX` script for every table from live metadata.
    ///
    /// Meant as model context: it is always valid SQL, not a byte-exact copy of the
    /// original DDL.
    pub fn schema_sql(&self) -> Result<String> {
        let conn = self.conn()?;
        let mut out = String::new();
        for t in self.list_tables()? {
            if t.kind == TableKind::View {
                write_view(conn, &t, &mut out)?;
            } else {
                write_table(conn, &t, &mut out)?;
            }
            out.push('\n');
        }
        Ok(out)
    }
}

pub(crate) fn count_rows(conn: &Connection, table: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
        [],
        |row| row.get(0),
    )
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| {
            let declared_type: Option<String> = row.get(2)?;
            let not_null: i64 = row.get(3)?;
            let pk: i64 = row.get(5)?;
            Ok(ColumnInfo {
                cid: row.get(0)?,
                name: row.get(1)?,
                declared_type: declared_type.unwrap_or_default(),
                not_null: not_null == 1,
                default_value: row.get(4)?,
                primary_key: pk > 0,
                pk_ordinal: pk,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

fn table_indexes(conn: &Connection, table: &str) -> Result<Vec<IndexInfo>> {
    let mut stmt = conn.prepare(&format!("PRAGMA index_list({})", quote_ident(table)))?;
    let listed = stmt
        .query_map([], |row| {
            let name: String = row.get(1)?;
            let unique: i64 = row.get(2)?;
            let origin: String = row.get(3)?;
            Ok((name, unique == 1, origin))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut indexes = Vec::with_capacity(listed.len());
    for (name, unique, origin) in listed {
        let mut info = conn.prepare(&format!("PRAGMA index_info({})", quote_ident(&name)))?;
        // Expression columns have no name; they cannot be reproduced from metadata.
        let columns = info
            .query_map([], |row| row.get::<_, Option<String>>(2))?
            .collect::<rusqlite::Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();
        indexes.push(IndexInfo {
            name,
            unique,
            columns,
            origin,
        });
    }
    Ok(indexes)
}

fn foreign_keys(conn: &Connection, table: &str) -> Result<Vec<ForeignKeyPart>> {
    let mut stmt = conn.prepare(&format!(
        "PRAGMA foreign_key_list({})",
        quote_ident(table)
    ))?;
    let parts = stmt
        .query_map([], |row| {
            Ok(ForeignKeyPart {
                id: row.get(0)?,
                parent_table: row.get(2)?,
                from: row.get(3)?,
                to: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(parts)
}

fn references_clause(parent: &str, to: &[Option<String>]) -> String {
    let cols: Vec<String> = to.iter().flatten().map(|c| quote_ident(c)).collect();
    if cols.len() == to.len() && !cols.is_empty() {
        format!("REFERENCES {}({})", quote_ident(parent), cols.join(", "))
    } else {
        // Parent columns omitted: the reference targets the parent's primary key.
        format!("REFERENCES {}", quote_ident(parent))
    }
}

fn write_table(conn: &Connection, t: &TableInfo, out: &mut String) -> Result<()> {
    let schema = TableSchema {
        columns: table_columns(conn, &t.name)?,
        indexes: table_indexes(conn, &t.name)?,
    };

    // Single-column constraints attach to their column; composite ones become table constraints.
    let mut fk_groups: BTreeMap<i64, Vec<ForeignKeyPart>> = BTreeMap::new();
    for part in foreign_keys(conn, &t.name)? {
        fk_groups.entry(part.id).or_default().push(part);
    }
    let mut column_refs: HashMap<String, String> = HashMap::new();
    let mut table_constraints = Vec::new();
    for parts in fk_groups.values() {
        let to: Vec<Option<String>> = parts.iter().map(|p| p.to.clone()).collect();
        let clause = references_clause(&parts[0].parent_table, &to);
        if parts.len() == 1 {
            column_refs.insert(parts[0].from.clone(), clause);
        } else {
            let from: Vec<String> = parts.iter().map(|p| quote_ident(&p.from)).collect();
            table_constraints.push(format!("FOREIGN KEY ({}) {}", from.join(", "), clause));
        }
    }

    let mut pk_columns: Vec<&ColumnInfo> =
        schema.columns.iter().filter(|c| c.primary_key).collect();
    pk_columns.sort_by_key(|c| c.pk_ordinal);
    let composite_pk = pk_columns.len() > 1;
    if composite_pk {
        let cols: Vec<String> = pk_columns.iter().map(|c| quote_ident(&c.name)).collect();
        table_constraints.insert(0, format!("PRIMARY KEY ({})", cols.join(", ")));
    }

    let mut defs: Vec<String> = schema
        .columns
        .iter()
        .map(|c| {
            let ty = if c.declared_type.is_empty() {
                "ANY"
            } else {
                c.declared_type.as_str()
            };
            let mut def = format!("  {} {}", ddl_ident(&c.name), ty);
            if c.primary_key && !composite_pk {
                def.push_str(" PRIMARY KEY");
            }
            if c.not_null {
                def.push_str(" NOT NULL");
            }
            if let Some(ref d) = c.default_value {
                def.push_str(" DEFAULT ");
                def.push_str(d);
            }
            if let Some(r) = column_refs.get(&c.name) {
                def.push(' ');
                def.push_str(r);
            }
            def
        })
        .collect();
    defs.extend(table_constraints.into_iter().map(|c| format!("  {c}")));

    let _ = writeln!(out, "-- {} ({} rows)", t.name, format_count(t.row_count));
    let _ = writeln!(
        out,
        "CREATE TABLE {} (\n{}\n);",
        quote_ident(&t.name),
        defs.join(",\n")
    );

    for idx in &schema.indexes {
        let cols: Vec<String> = idx.columns.iter().map(|c| quote_ident(c)).collect();
        if idx.is_implicit() {
            // Backed by a constraint; SQLite reserves the sqlite_ prefix, so note it only.
            if idx.origin == "u" {
                let _ = writeln!(out, "-- UNIQUE ({}) via {}", cols.join(", "), idx.name);
            }
            continue;
        }
        let unique = if idx.unique { "UNIQUE " } else { "" };
        let _ = writeln!(
            out,
            "CREATE {}INDEX {} ON {} ({});",
            unique,
            quote_ident(&idx.name),
            quote_ident(&t.name),
            cols.join(", ")
        );
    }
    Ok(())
}

fn write_view(conn: &Connection, t: &TableInfo, out: &mut String) -> Result<()> {
    let sql: Option<String> = conn.query_row(
        "SELECT sql FROM sqlite_master WHERE type = 'view' AND name = ?1",
        [&t.name],
        |row| row.get(0),
    )?;
    let _ = writeln!(out, "-- {} (view, {} rows)", t.name, format_count(t.row_count));
    if let Some(sql) = sql {
        let _ = writeln!(out, "{};", sql.trim_end_matches(';'));
    }
    Ok(())
}
