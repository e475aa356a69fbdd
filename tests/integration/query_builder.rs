//! Integration tests for query building and terminal operations
//!
//! These tests run against an in-memory SQLite database registered as the
//! default connection, and inspect the query log to check exactly which
//! statements were issued.

mod common;

use common::{fresh_database, placeholder_count, serial, statements};
use lifebuoy::{table, connection, Criterion, OrmError, QueryLog};
use serde::Deserialize;
use serde_json::{json, Value};

const USERS: &str = "CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    age INTEGER,
    status TEXT,
    deleted_at TEXT
)";

fn seed() {
    for (name, age, status) in [
        ("Ann", 34, "active"),
        ("Bob", 17, "trial"),
        ("Cid", 52, "active"),
        ("Dee", 29, "banned"),
    ] {
        table("users")
            .insert(json!({"name": name, "age": age, "status": status}))
            .unwrap();
    }
    QueryLog::reset();
}

#[test]
fn test_bound_values_match_placeholders() {
    let statement = table("users")
        .where_eq("status", "active")
        .where_op("age", ">=", 18)
        .where_in("id", [1, 2, 3])
        .where_between("age", 18, 65)
        .where_not_in("name", Vec::<Value>::new())
        .where_raw("`name` like ?", ["A%"])
        .order_by_desc("age")
        .limit_offset(5, 10)
        .build()
        .unwrap();

    assert_eq!(
        statement.sql,
        "SELECT * FROM users WHERE `status` = ? AND `age` >= ? AND `id` IN (?, ?, ?) \
         AND `age` BETWEEN ? AND ? AND 1 = 1 AND `name` like ? ORDER BY `age` DESC LIMIT 5, 10"
    );
    assert_eq!(placeholder_count(&statement.sql), statement.values.len());
    assert_eq!(
        statement.values,
        vec![json!("active"), json!(18), json!(1), json!(2), json!(3), json!(18), json!(65), json!("A%")]
    );
}

#[test]
fn test_update_binds_write_values_before_predicates() {
    let _guard = serial();
    fresh_database("default", USERS);
    seed();

    let affected = table("users")
        .where_eq("status", "active")
        .where_op("age", ">", 40)
        .update(json!({"status": "retired", "age": 53}))
        .unwrap();
    assert_eq!(affected, 1);

    let log = QueryLog::entries_for("default");
    assert_eq!(log.len(), 1);
    assert_eq!(
        log[0].sql,
        "UPDATE users SET `status` = ?, `age` = ? WHERE `status` = ? AND `age` > ?"
    );
    assert_eq!(log[0].values, vec![json!("retired"), json!(53), json!("active"), json!(40)]);
    assert!(log[0].cost.is_some());

    let cid = table("users").where_eq("name", "Cid").first().unwrap().unwrap();
    assert_eq!(cid.get("status"), Some(&json!("retired")));
}

#[test]
fn test_null_renders_is_null() {
    let by_value = table("users").where_eq("deleted_at", Value::Null).build().unwrap();
    let by_operator = table("users").where_op("deleted_at", "=", Value::Null).build().unwrap();
    let negated = table("users").where_op("deleted_at", "<>", Value::Null).build().unwrap();

    assert_eq!(by_value.sql, "SELECT * FROM users WHERE `deleted_at` IS NULL");
    assert_eq!(by_operator.sql, by_value.sql);
    assert!(by_value.values.is_empty());
    assert_eq!(negated.sql, "SELECT * FROM users WHERE `deleted_at` IS NOT NULL");
}

#[test]
fn test_null_predicate_matches_rows() {
    let _guard = serial();
    fresh_database("default", USERS);
    seed();
    table("users").where_eq("name", "Dee").update(json!({"deleted_at": "2024-01-01"})).unwrap();

    assert_eq!(table("users").where_eq("deleted_at", Value::Null).count().unwrap(), 3);
    assert_eq!(table("users").where_not_null("deleted_at").count().unwrap(), 1);
}

#[test]
fn test_empty_write_payload_issues_nothing() {
    let _guard = serial();
    fresh_database("default", USERS);

    let err = table("users").insert(json!({})).unwrap_err();
    assert_eq!(err, OrmError::EmptyWritePayload("insert"));

    let err = table("users").where_eq("id", 1).update(json!({})).unwrap_err();
    assert_eq!(err, OrmError::EmptyWritePayload("update"));

    assert!(statements("default").is_empty());
}

#[test]
fn test_unsupported_operator_issues_nothing() {
    let _guard = serial();
    fresh_database("default", USERS);

    let err = table("users").where_op("age", "??", 3).get().unwrap_err();
    assert_eq!(err, OrmError::UnsupportedOperator("??".to_string()));

    let err = table("users").where_op("age", "between", 3).delete().unwrap_err();
    assert!(matches!(err, OrmError::UnsupportedOperator(_)));

    assert!(statements("default").is_empty());
}

#[test]
fn test_insert_returns_key_first() {
    let _guard = serial();
    fresh_database("default", USERS);

    let first = table("users").insert(json!({"name": "Ann", "age": 34})).unwrap().unwrap();
    let second = table("users").insert([("name", "Bob")]).unwrap().unwrap();

    assert_eq!(first.to_json(), json!({"id": 1, "name": "Ann", "age": 34}));
    assert_eq!(second.get("id"), Some(&json!(2)));
    let keys: Vec<&String> = first.attributes().keys().collect();
    assert_eq!(keys, vec!["id", "name", "age"]);

    assert_eq!(
        statements("default"),
        vec![
            "INSERT INTO users (`name`, `age`) VALUES (?, ?)".to_string(),
            "INSERT INTO users (`name`) VALUES (?)".to_string(),
        ]
    );
}

#[test]
fn test_structured_values_are_serialized_on_write() {
    let _guard = serial();
    fresh_database("default", "CREATE TABLE settings (id INTEGER PRIMARY KEY, body TEXT)");

    table("settings").insert(json!({"body": {"theme": "dark", "tabs": [1, 2]}})).unwrap();

    let log = QueryLog::entries_for("default");
    assert_eq!(log[0].values, vec![json!(r#"{"theme":"dark","tabs":[1,2]}"#)]);

    let stored = table("settings").first().unwrap().unwrap();
    assert_eq!(stored.get("body"), Some(&json!(r#"{"theme":"dark","tabs":[1,2]}"#)));
}

#[test]
fn test_find_first_and_aggregates() {
    let _guard = serial();
    fresh_database("default", USERS);
    seed();

    let bob = table("users").find(2).unwrap().unwrap();
    assert_eq!(bob.get("name"), Some(&json!("Bob")));
    assert!(table("users").find(99).unwrap().is_none());
    assert!(table("users").where_eq("name", "Zed").first().unwrap().is_none());

    assert_eq!(table("users").count().unwrap(), 4);
    assert_eq!(table("users").where_eq("status", "active").count().unwrap(), 2);
    assert_eq!(table("users").sum("age").unwrap(), 132.0);
    assert_eq!(table("users").where_eq("status", "active").avg("age").unwrap(), Some(43.0));
    assert_eq!(table("users").where_eq("status", "none").sum("age").unwrap(), 0.0);
    assert_eq!(table("users").where_eq("status", "none").avg("age").unwrap(), None);

    let sql = statements("default");
    assert!(sql.contains(&"SELECT COUNT(1) as count FROM users".to_string()));
    assert!(sql.contains(&"SELECT * FROM users WHERE `id` = ? LIMIT 1".to_string()));
}

#[test]
fn test_where_map_and_select() {
    let _guard = serial();
    fresh_database("default", USERS);
    seed();

    let query = table("users")
        .select(["name", "age"])
        .where_map(vec![
            ("status", Criterion::from("active")),
            ("age", Criterion::op(">=", 40)),
        ]);
    assert_eq!(
        query.to_sql().unwrap(),
        "SELECT `name`, `age` FROM users WHERE `status` = ? AND `age` >= ?"
    );

    let rows = query.get().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].to_json(), json!({"name": "Cid", "age": 52}));
}

#[test]
fn test_where_exists_inlines_subquery_values() {
    let _guard = serial();
    fresh_database(
        "default",
        &format!("{USERS}; CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER, title TEXT)"),
    );
    seed();
    table("posts").insert(json!({"user_id": 1, "title": "hello"})).unwrap();
    table("posts").insert(json!({"user_id": 3, "title": "draft"})).unwrap();

    let has_hello = table("posts")
        .select_raw("1")
        .where_raw("posts.`user_id` = users.`id`", Vec::<Value>::new())
        .where_eq("title", "hello");
    let query = table("users").where_exists(&has_hello).where_op("age", ">", 18);

    let statement = query.build().unwrap();
    assert_eq!(
        statement.sql,
        "SELECT * FROM users WHERE EXISTS (SELECT 1 FROM posts WHERE posts.`user_id` = users.`id` \
         AND `title` = ?) AND `age` > ?"
    );
    assert_eq!(statement.values, vec![json!("hello"), json!(18)]);

    let found = query.get().unwrap();
    assert_eq!(found.pluck("name"), vec![json!("Ann")]);
}

#[test]
fn test_group_by_renders_before_order_and_limit() {
    let _guard = serial();
    fresh_database("default", USERS);
    seed();

    let query = table("users")
        .select_raw("`status`, COUNT(1) as total")
        .group_by(["status"])
        .order_by_desc("total")
        .limit(2);
    assert_eq!(
        query.to_sql().unwrap(),
        "SELECT `status`, COUNT(1) as total FROM users GROUP BY `status` ORDER BY `total` DESC LIMIT 2"
    );

    let rows = query.get().unwrap();
    assert_eq!(rows[0].to_json(), json!({"status": "active", "total": 2}));
    assert_eq!(rows.len(), 2);
}

#[test]
fn test_delete_and_unscoped_update() {
    let _guard = serial();
    fresh_database("default", USERS);
    seed();

    assert_eq!(table("users").where_op("age", "<", 18).delete().unwrap(), 1);
    assert_eq!(table("users").update(json!({"status": "migrated"})).unwrap(), 3);
    assert_eq!(table("users").where_eq("status", "migrated").count().unwrap(), 3);
    assert_eq!(table("users").where_eq("id", 99).delete().unwrap(), 0);
}

#[test]
fn test_typed_results() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: i64,
        name: String,
        age: Option<i64>,
    }

    let _guard = serial();
    fresh_database("default", USERS);
    seed();

    let users: Vec<User> = table("users").order_by("age").get_as().unwrap();
    assert_eq!(users[0], User { id: 2, name: "Bob".into(), age: Some(17) });

    let oldest: Option<User> = table("users").order_by_desc("age").first_as().unwrap();
    assert_eq!(oldest.map(|u| u.name), Some("Cid".to_string()));
}

#[test]
fn test_unknown_connection() {
    let err = connection("nowhere").table("users").get().unwrap_err();
    assert_eq!(err, OrmError::ConnectionNotFound("nowhere".to_string()));
    assert_eq!(err.to_string(), "Connection nowhere does not exist");
}

#[test]
fn test_driver_error_is_wrapped() {
    let _guard = serial();
    fresh_database("default", USERS);

    let err = table("ghosts").get().unwrap_err();
    match err {
        OrmError::StatementExecutionFailure(message) => assert!(message.contains("no such table: ghosts")),
        other => panic!("unexpected error: {other:?}"),
    }
}
