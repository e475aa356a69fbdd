//! Integration tests for raw statement execution and the query log

mod common;

use common::{fresh_database, serial, statements};
use lifebuoy::{connection, execute, query_log, ModelSchema, QueryLog, RawOutcome};
use serde_json::json;

#[test]
fn test_leading_keyword_selects_the_path() {
    let _guard = serial();
    fresh_database("default", "");

    let created = execute("CREATE TABLE tags (id INTEGER PRIMARY KEY, label TEXT)", []).unwrap();
    assert_eq!(created, RawOutcome::Success(true));

    let inserted = execute("INSERT INTO tags (label) VALUES (?)", [json!("rust")]).unwrap();
    assert_eq!(inserted, RawOutcome::Inserted(json!(1)));
    execute("insert into tags (label) values (?)", [json!("sql")]).unwrap();

    let rows = execute("  select * from tags order by id", []).unwrap().into_rows();
    assert_eq!(rows.pluck("label"), vec![json!("rust"), json!("sql")]);

    let updated = execute("UPDATE tags SET label = upper(label)", []).unwrap();
    assert_eq!(updated, RawOutcome::Affected(2));
    assert_eq!(updated.affected(), 2);

    let deleted = execute("DELETE FROM tags WHERE label = ?", [json!("SQL")]).unwrap();
    assert_eq!(deleted, RawOutcome::Affected(1));

    let ignored = execute("INSERT OR IGNORE INTO tags (id, label) VALUES (?, ?)", [json!(1), json!("dup")]).unwrap();
    assert_eq!(ignored, RawOutcome::Success(false));
}

#[test]
fn test_raw_select_maps_through_schema() {
    let _guard = serial();
    fresh_database(
        "raw",
        "CREATE TABLE docs (id INTEGER PRIMARY KEY, meta TEXT);
         INSERT INTO docs (meta) VALUES ('{\"pages\":3}');",
    );
    let docs = ModelSchema::builder("docs")
        .connection("raw")
        .json_fields(["meta"])
        .build();

    let rows = docs
        .query()
        .execute_raw("SELECT * FROM docs WHERE id = ?", [json!(1)])
        .unwrap()
        .into_rows();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].lookup("meta.pages"), Some(json!(3)));
    assert!(rows[0].is_persisted());
}

#[test]
fn test_driver_error_propagates() {
    let _guard = serial();
    fresh_database("raw", "");

    let err = connection("raw").execute_raw("SELEC nonsense", []).unwrap_err();
    assert!(err.to_string().contains("syntax error"));
}

#[test]
fn test_query_log_records_every_statement() {
    let _guard = serial();
    fresh_database("raw", "CREATE TABLE hits (id INTEGER PRIMARY KEY, path TEXT)");

    connection("raw").table("hits").insert(json!({"path": "/"})).unwrap();
    connection("raw").table("hits").where_eq("path", "/").get().unwrap();

    let log = query_log();
    assert_eq!(log.len(), 2);
    assert!(log.iter().all(|entry| entry.connection == "raw"));
    assert_eq!(log[0].values, vec![json!("/")]);
    assert!(log.iter().all(|entry| entry.cost.is_some()));
    assert!(log[0].executed_at <= log[1].executed_at);

    QueryLog::reset();
    assert!(statements("raw").is_empty());
    assert_eq!(QueryLog::len(), 0);
}

#[test]
fn test_failed_statement_is_logged_without_cost() {
    let _guard = serial();
    fresh_database("raw", "");

    assert!(connection("raw").table("missing").get().is_err());

    let log = QueryLog::entries_for("raw");
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].sql, "SELECT * FROM missing");
    assert!(log[0].cost.is_none());
}
