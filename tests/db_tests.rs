//! Database tests against real files in a temp dir: open/close, catalog, queries, edits, import/export.

use rusqlite::Connection;
use serde_json::{Map, Value, json};
use sqlity::{CellValue, Database, Error, SortOrder, TableKind};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SCHEMA: &str = "
    CREATE TABLE users (
        id INTEGER PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        age INTEGER DEFAULT 0,
        score REAL,
        joined DATETIME
    );
    CREATE INDEX idx_users_name ON users (name);
    CREATE TABLE posts (
        id INTEGER PRIMARY KEY,
        user_id INTEGER REFERENCES users(id),
        title TEXT UNIQUE
    );
    INSERT INTO users (name, age, score) VALUES ('alice', 30, 1.5);
    INSERT INTO users (name, age, score) VALUES ('bob', 25, 2.0);
    INSERT INTO users (name, age, score) VALUES ('carol', 41, NULL);
    INSERT INTO posts (user_id, title) VALUES (1, 'hello');
";

/// Temp dir holding `test.db` created from `SCHEMA`. Keep the dir alive for the test's duration.
fn fixture() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    (dir, path)
}

/// Count rows in `table` by reading the file directly, bypassing the image.
fn count_on_disk(path: &Path, table: &str) -> i64 {
    let conn = Connection::open(path).unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |r| {
        r.get(0)
    })
    .unwrap()
}

fn object(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        _ => panic!("expected a JSON object"),
    }
}

fn single_text(db: &mut Database, sql: &str) -> String {
    let result = db.execute_query(sql).unwrap();
    result.values[0][0].as_text().unwrap().to_string()
}

#[test]
fn test_open_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Database::open(dir.path().join("missing.db")).err().unwrap();
    assert!(matches!(err, Error::Io(_)));
    assert_eq!(err.error_code(), "IO_ERROR");
}

#[test]
fn test_open_non_database_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.db");
    std::fs::write(&path, "this is plainly not a sqlite database\n".repeat(200)).unwrap();
    let err = Database::open(&path).err().unwrap();
    assert!(matches!(err, Error::Open { .. }));
}

#[test]
fn test_operations_after_close_fail_not_open() {
    let (_dir, path) = fixture();
    let mut db = Database::open(&path).unwrap();
    assert!(db.is_open());
    db.close().unwrap();
    assert!(!db.is_open());
    assert!(matches!(db.list_tables(), Err(Error::NotOpen)));
    assert!(matches!(db.execute_query("SELECT 1"), Err(Error::NotOpen)));
    // Closing twice is harmless.
    db.close().unwrap();
}

#[test]
fn test_list_tables_sorted_with_counts() {
    let (_dir, path) = fixture();
    let db = Database::open(&path).unwrap();
    let tables = db.list_tables().unwrap();
    let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["posts", "users"]);
    assert_eq!(tables[0].row_count, 1);
    assert_eq!(tables[1].row_count, 3);
    assert!(tables.iter().all(|t| t.kind == TableKind::Table));
}

#[test]
fn test_list_tables_broken_view_counts_zero() {
    let (_dir, path) = fixture();
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE scratch (x INTEGER);
             CREATE VIEW broken AS SELECT x FROM scratch;
             CREATE VIEW adults AS SELECT * FROM users WHERE age >= 30;
             DROP TABLE scratch;",
        )
        .unwrap();
    }
    let db = Database::open(&path).unwrap();
    let tables = db.list_tables().unwrap();
    let broken = tables.iter().find(|t| t.name == "broken").unwrap();
    assert_eq!(broken.kind, TableKind::View);
    assert_eq!(broken.row_count, 0);
    let adults = tables.iter().find(|t| t.name == "adults").unwrap();
    assert_eq!(adults.row_count, 2);
}

#[test]
fn test_describe_table_columns_and_indexes() {
    let (_dir, path) = fixture();
    let db = Database::open(&path).unwrap();
    let schema = db.describe_table("users").unwrap();
    let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["id", "name", "age", "score", "joined"]);

    let id = &schema.columns[0];
    assert!(id.primary_key);
    assert!(id.not_null);
    assert_eq!(id.declared_type, "INTEGER");
    let age = &schema.columns[2];
    assert_eq!(age.default_value.as_deref(), Some("0"));
    assert!(!age.primary_key);

    assert_eq!(schema.indexes.len(), 1);
    assert_eq!(schema.indexes[0].name, "idx_users_name");
    assert!(!schema.indexes[0].unique);
    assert_eq!(schema.indexes[0].columns, ["name"]);

    let posts = db.describe_table("posts").unwrap();
    assert!(posts.indexes.iter().any(|i| i.unique && i.columns == ["title"]));
}

#[test]
fn test_describe_unknown_table_is_empty() {
    let (_dir, path) = fixture();
    let db = Database::open(&path).unwrap();
    let schema = db.describe_table("nope").unwrap();
    assert!(schema.columns.is_empty());
    assert!(schema.indexes.is_empty());
}

#[test]
fn test_schema_sql_rebuilds_ddl() {
    let (_dir, path) = fixture();
    let db = Database::open(&path).unwrap();
    let sql = db.schema_sql().unwrap();

    assert!(sql.contains("-- users (3 rows)"));
    assert!(sql.contains("CREATE TABLE \"users\" ("));
    assert!(sql.contains("  id INTEGER PRIMARY KEY NOT NULL,"));
    assert!(sql.contains("  name TEXT NOT NULL,"));
    assert!(sql.contains("  age INTEGER DEFAULT 0,"));
    assert!(sql.contains("CREATE INDEX \"idx_users_name\" ON \"users\" (\"name\");"));
    assert!(sql.contains("  user_id INTEGER REFERENCES \"users\"(\"id\")"));
    // Constraint-backed index is noted, never emitted as CREATE INDEX.
    assert!(!sql.contains("CREATE UNIQUE INDEX \"sqlite_autoindex"));

    // The script must itself be valid SQL.
    let scratch = Connection::open_in_memory().unwrap();
    scratch.execute_batch(&sql).unwrap();
}

#[test]
fn test_schema_sql_composite_primary_key() {
    let (_dir, path) = fixture();
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE pairs (a INTEGER, b TEXT, PRIMARY KEY (b, a));")
            .unwrap();
    }
    let db = Database::open(&path).unwrap();
    let sql = db.schema_sql().unwrap();
    assert!(sql.contains("  PRIMARY KEY (\"b\", \"a\")"));
}

#[test]
fn test_execute_select_returns_rows() {
    let (_dir, path) = fixture();
    let mut db = Database::open(&path).unwrap();
    let result = db.execute_query("SELECT 1").unwrap();
    assert_eq!(result.values, vec![vec![CellValue::Integer(1)]]);
    assert_eq!(result.rows_affected, 0);

    let result = db
        .execute_query("  select name, score from users order by id")
        .unwrap();
    assert_eq!(result.columns, ["name", "score"]);
    assert_eq!(result.values.len(), 3);
    assert_eq!(result.values[2][1], CellValue::Null);
    assert!(!db.is_dirty());
}

#[test]
fn test_execute_mutation_flushes_to_disk() {
    let (_dir, path) = fixture();
    let mut db = Database::open(&path).unwrap();
    let result = db.execute_query("DELETE FROM users WHERE age < 35").unwrap();
    assert_eq!(result.rows_affected, 2);
    assert!(result.columns.is_empty());
    assert!(!db.is_dirty());
    assert_eq!(count_on_disk(&path, "users"), 1);
}

#[test]
fn test_execute_engine_errors_pass_through() {
    let (_dir, path) = fixture();
    let mut db = Database::open(&path).unwrap();
    let err = db.execute_query("SELEC * FROM users").err().unwrap();
    assert!(matches!(err, Error::Sql(_)));

    let err = db
        .execute_query("INSERT INTO users (name) VALUES (NULL)")
        .err()
        .unwrap();
    assert_eq!(err.error_code(), "SQLITE_CONSTRAINT");
    assert_eq!(count_on_disk(&path, "users"), 3);
}

#[test]
fn test_execute_batch_failing_midway_keeps_disk_in_step() {
    let (_dir, path) = fixture();
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE tags (v TEXT UNIQUE); INSERT INTO tags VALUES ('a');")
            .unwrap();
    }
    let mut db = Database::open(&path).unwrap();
    let err = db
        .execute_query("INSERT INTO tags (v) VALUES ('x'); INSERT INTO tags (v) VALUES ('a')")
        .err()
        .unwrap();
    assert_eq!(err.error_code(), "SQLITE_CONSTRAINT");

    // The first insert stays applied in the image and is already on disk.
    assert_eq!(single_text(&mut db, "SELECT group_concat(v) FROM tags"), "a,x");
    assert_eq!(count_on_disk(&path, "tags"), 2);
    assert!(!db.is_dirty());

    db.close().unwrap();
    assert_eq!(count_on_disk(&path, "tags"), 2);
}

#[test]
fn test_execute_multiple_read_statements_rejected() {
    let (_dir, path) = fixture();
    let mut db = Database::open(&path).unwrap();
    let err = db.execute_query("SELECT 1; SELECT 2").err().unwrap();
    assert!(matches!(err, Error::Sql(rusqlite::Error::MultipleStatement)));
    let err = db.execute_query("SELECT 1; DELETE FROM users").err().unwrap();
    assert!(matches!(err, Error::Sql(rusqlite::Error::MultipleStatement)));
    assert_eq!(count_on_disk(&path, "users"), 3);
    assert!(!db.is_dirty());
}

#[test]
fn test_table_page_walks_all_pages() {
    let (_dir, path) = fixture();
    let mut db = Database::open(&path).unwrap();
    db.execute_query("INSERT INTO users (name) VALUES ('dave'), ('erin')")
        .unwrap();

    let mut seen = Vec::new();
    for page in 0..3 {
        let data = db
            .table_page("users", page, 2, None, SortOrder::Asc)
            .unwrap();
        assert_eq!(data.total_rows, 5);
        assert_eq!(data.result.columns[0], "__rowid");
        seen.extend(data.result.values.iter().map(|r| r[0].as_integer().unwrap()));
    }
    assert_eq!(seen, [1, 2, 3, 4, 5]);

    let past_end = db
        .table_page("users", 10, 2, None, SortOrder::Asc)
        .unwrap();
    assert!(past_end.result.values.is_empty());
    assert_eq!(past_end.total_rows, 5);
}

#[test]
fn test_table_page_orders_by_column() {
    let (_dir, path) = fixture();
    let db = Database::open(&path).unwrap();
    let data = db
        .table_page("users", 0, 10, Some("age"), SortOrder::Desc)
        .unwrap();
    let name_col = data.result.columns.iter().position(|c| c == "name").unwrap();
    let names: Vec<&str> = data
        .result
        .values
        .iter()
        .map(|r| r[name_col].as_text().unwrap())
        .collect();
    assert_eq!(names, ["carol", "alice", "bob"]);
}

#[test]
fn test_insert_row_coerces_by_declared_type() {
    let (_dir, path) = fixture();
    let mut db = Database::open(&path).unwrap();
    let rowid = db
        .insert_row(
            "users",
            &object(json!({"name": "dave", "age": "37", "score": "4.25", "joined": "2024/03/05"})),
        )
        .unwrap();
    assert_eq!(rowid, 4);
    assert_eq!(
        single_text(&mut db, "SELECT typeof(age) FROM users WHERE rowid = 4"),
        "integer"
    );
    assert_eq!(
        single_text(&mut db, "SELECT typeof(score) FROM users WHERE rowid = 4"),
        "real"
    );
    assert_eq!(
        single_text(&mut db, "SELECT joined FROM users WHERE rowid = 4"),
        "2024-03-05T00:00:00.000Z"
    );

    db.insert_row("users", &object(json!({"name": "erin", "age": "abc"})))
        .unwrap();
    assert_eq!(
        single_text(&mut db, "SELECT typeof(age) FROM users WHERE name = 'erin'"),
        "text"
    );
    assert_eq!(count_on_disk(&path, "users"), 5);
}

#[test]
fn test_insert_row_omitted_columns_take_defaults() {
    let (_dir, path) = fixture();
    let mut db = Database::open(&path).unwrap();
    db.insert_row("users", &object(json!({"name": "frank"})))
        .unwrap();
    let result = db
        .execute_query("SELECT age FROM users WHERE name = 'frank'")
        .unwrap();
    assert_eq!(result.values[0][0], CellValue::Integer(0));

    db.insert_row("posts", &Map::new()).unwrap();
    assert_eq!(count_on_disk(&path, "posts"), 2);
}

#[test]
fn test_update_row_sets_one_cell() {
    let (_dir, path) = fixture();
    let mut db = Database::open(&path).unwrap();
    let changed = db.update_row("users", 2, "age", &json!("26")).unwrap();
    assert_eq!(changed, 1);
    let result = db.execute_query("SELECT age FROM users WHERE id = 2").unwrap();
    assert_eq!(result.values[0][0], CellValue::Integer(26));

    db.update_row("users", 2, "score", &Value::Null).unwrap();
    let result = db
        .execute_query("SELECT score FROM users WHERE id = 2")
        .unwrap();
    assert!(result.values[0][0].is_null());

    assert_eq!(db.update_row("users", 99, "age", &json!(1)).unwrap(), 0);
}

#[test]
fn test_delete_rows() {
    let (_dir, path) = fixture();
    let mut db = Database::open(&path).unwrap();
    assert_eq!(db.delete_rows("users", &[1, 3, 42]).unwrap(), 2);
    assert_eq!(count_on_disk(&path, "users"), 1);
    assert_eq!(db.delete_rows("users", &[]).unwrap(), 0);
}

#[test]
fn test_edits_survive_close_and_reopen() {
    let (_dir, path) = fixture();
    let mut db = Database::open(&path).unwrap();
    db.insert_row("users", &object(json!({"name": "gina", "age": 50})))
        .unwrap();
    db.close().unwrap();

    let db = Database::open(&path).unwrap();
    let users = db.list_tables().unwrap();
    assert_eq!(users.iter().find(|t| t.name == "users").unwrap().row_count, 4);
}

#[test]
fn test_quoted_identifiers() {
    let (_dir, path) = fixture();
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE \"odd \"\"name\"\"\" (\"first col\" TEXT);")
            .unwrap();
    }
    let mut db = Database::open(&path).unwrap();
    let table = "odd \"name\"";
    db.insert_row(table, &object(json!({"first col": "x"})))
        .unwrap();
    let data = db.table_page(table, 0, 10, Some("first col"), SortOrder::Asc).unwrap();
    assert_eq!(data.total_rows, 1);
    assert_eq!(data.result.values[0][1], CellValue::Text("x".into()));
}

#[test]
fn test_export_csv_quotes_and_nulls() {
    let (_dir, path) = fixture();
    let mut db = Database::open(&path).unwrap();
    db.execute_query("UPDATE users SET name = 'al, \"the\" great' WHERE id = 1")
        .unwrap();
    let csv = db.export_csv("users").unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "id,name,age,score,joined");
    assert_eq!(lines[1], "1,\"al, \"\"the\"\" great\",30,1.5,");
    assert_eq!(lines[3], "3,carol,41,,");
}

#[test]
fn test_export_csv_keeps_carriage_return_inside_field() {
    let (_dir, path) = fixture();
    let mut db = Database::open(&path).unwrap();
    db.execute_query("UPDATE users SET name = 'line' || char(13) || 'break' WHERE id = 2")
        .unwrap();
    let csv = db.export_csv("users").unwrap();
    let rows = sqlity::engine::parse_csv(&csv);
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[2][1], "line\rbreak");
}

#[test]
fn test_export_csv_empty_table_keeps_header() {
    let (_dir, path) = fixture();
    let mut db = Database::open(&path).unwrap();
    db.execute_query("DELETE FROM posts").unwrap();
    assert_eq!(db.export_csv("posts").unwrap(), "id,user_id,title");
    assert_eq!(db.export_json("posts").unwrap(), "[]");
}

#[test]
fn test_csv_round_trip_into_empty_table() {
    let (_dir, path) = fixture();
    let mut db = Database::open(&path).unwrap();
    db.execute_query(
        "CREATE TABLE users_copy (id INTEGER PRIMARY KEY NOT NULL, name TEXT NOT NULL, \
         age INTEGER DEFAULT 0, score REAL, joined DATETIME)",
    )
    .unwrap();
    let csv = db.export_csv("users").unwrap();
    assert_eq!(db.import_csv("users_copy", &csv).unwrap(), 3);
    assert_eq!(db.export_csv("users_copy").unwrap(), csv);
    assert_eq!(count_on_disk(&path, "users_copy"), 3);
}

#[test]
fn test_json_round_trip_preserves_types() {
    let (_dir, path) = fixture();
    let mut db = Database::open(&path).unwrap();
    db.execute_query("CREATE TABLE posts_copy (id INTEGER PRIMARY KEY, user_id INTEGER, title TEXT)")
        .unwrap();
    let json = db.export_json("posts").unwrap();
    let parsed: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, json!([{"id": 1, "user_id": 1, "title": "hello"}]));

    assert_eq!(db.import_json("posts_copy", &json).unwrap(), 1);
    assert_eq!(db.export_json("posts_copy").unwrap(), json);
}

#[test]
fn test_import_json_missing_keys_become_null() {
    let (_dir, path) = fixture();
    let mut db = Database::open(&path).unwrap();
    let n = db
        .import_json(
            "users",
            r#"[{"name": "hal", "score": 1}, {"name": "ivy"}]"#,
        )
        .unwrap();
    assert_eq!(n, 2);
    let result = db
        .execute_query("SELECT score FROM users WHERE name = 'ivy'")
        .unwrap();
    assert!(result.values[0][0].is_null());
}

#[test]
fn test_import_failure_rolls_back_whole_batch() {
    let (_dir, path) = fixture();
    let mut db = Database::open(&path).unwrap();
    let csv = "name,age\njoe,20\n,21\nkim,22\n";
    let err = db.import_csv("users", csv).err().unwrap();
    match err {
        Error::ImportBatch { row, .. } => assert_eq!(row, 2),
        other => panic!("expected ImportBatch, got {other:?}"),
    }
    assert_eq!(db.list_tables().unwrap()[1].row_count, 3);
    assert_eq!(count_on_disk(&path, "users"), 3);
}

#[test]
fn test_json_import_failure_rolls_back_whole_batch() {
    let (_dir, path) = fixture();
    let mut db = Database::open(&path).unwrap();
    let json = r#"[{"name": "joe"}, {"name": null}, {"name": "kim"}]"#;
    let err = db.import_json("users", json).err().unwrap();
    match err {
        Error::ImportBatch { row, .. } => assert_eq!(row, 2),
        other => panic!("expected ImportBatch, got {other:?}"),
    }
    assert_eq!(
        single_text(&mut db, "SELECT CAST(COUNT(*) AS TEXT) FROM users WHERE name = 'joe'"),
        "0"
    );
    assert_eq!(count_on_disk(&path, "users"), 3);
    assert!(!db.is_dirty());
}

#[test]
fn test_import_empty_input_is_noop() {
    let (_dir, path) = fixture();
    let mut db = Database::open(&path).unwrap();
    assert_eq!(db.import_csv("users", "").unwrap(), 0);
    assert_eq!(db.import_csv("users", "name,age\n").unwrap(), 0);
    assert_eq!(db.import_json("users", "[]").unwrap(), 0);
    assert_eq!(count_on_disk(&path, "users"), 3);
}

#[test]
fn test_import_malformed_input() {
    let (_dir, path) = fixture();
    let mut db = Database::open(&path).unwrap();
    let err = db.import_csv("users", "name,age\nx,1,extra\n").err().unwrap();
    assert!(matches!(err, Error::ImportFormat(_)));
    let err = db.import_json("users", r#"{"name": "x"}"#).err().unwrap();
    assert!(matches!(err, Error::ImportFormat(_)));
    let err = db.import_json("users", r#"[{"name": "x"}, 3]"#).err().unwrap();
    assert_eq!(err.error_code(), "IMPORT_FORMAT");
    assert_eq!(count_on_disk(&path, "users"), 3);
}
