//! Integration tests for SQL-level and in-memory pagination

mod common;

use common::{fresh_database, serial, statements};
use lifebuoy::{connection, QueryBuilder, QueryLog};
use serde_json::json;

const CONNECTION: &str = "pages";

fn items() -> QueryBuilder {
    connection(CONNECTION).table("items")
}

/// Items 1..=25, `kind` alternating odd/even
fn setup() {
    fresh_database(
        CONNECTION,
        "CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT, kind TEXT)",
    );
    for id in 1..=25 {
        let kind = if id % 2 == 0 { "even" } else { "odd" };
        items()
            .insert(json!({"id": id, "label": format!("item-{id}"), "kind": kind}))
            .unwrap();
    }
    QueryLog::reset();
}

#[test]
fn test_second_page_of_ten() {
    let _guard = serial();
    setup();

    let page = items().order_by("id").paginate(10, 2).unwrap();

    assert_eq!(page.total(), 25);
    assert_eq!(page.per_page(), 10);
    assert_eq!(page.current_page(), 2);
    assert_eq!(page.last_page(), 2);
    assert_eq!(page.len(), 10);
    assert_eq!(page.first().and_then(|r| r.get("id")), Some(&json!(11)));
    assert_eq!(page.last().and_then(|r| r.get("id")), Some(&json!(20)));

    assert_eq!(
        statements(CONNECTION),
        vec![
            "SELECT COUNT(1) as count FROM items ORDER BY `id`".to_string(),
            "SELECT * FROM items ORDER BY `id` LIMIT 10, 10".to_string(),
        ]
    );
}

#[test]
fn test_page_below_one_is_first_page() {
    let _guard = serial();
    setup();

    for requested in [0, -3] {
        let page = items().order_by("id").paginate(10, requested).unwrap();
        assert_eq!(page.current_page(), 1);
        assert_eq!(page.pluck("id").first(), Some(&json!(1)));
    }
}

#[test]
fn test_count_ignores_existing_limit_but_keeps_predicates() {
    let _guard = serial();
    setup();

    let page = items().where_eq("kind", "odd").order_by("id").paginate(5, 3).unwrap();

    assert_eq!(page.total(), 13);
    assert_eq!(page.last_page(), 2);
    assert_eq!(page.pluck("id"), vec![json!(21), json!(23), json!(25)]);

    let log = QueryLog::entries_for(CONNECTION);
    assert_eq!(log[0].sql, "SELECT COUNT(1) as count FROM items WHERE `kind` = ? ORDER BY `id`");
    assert_eq!(log[1].sql, "SELECT * FROM items WHERE `kind` = ? ORDER BY `id` LIMIT 10, 5");
    assert_eq!(log[1].values, vec![json!("odd")]);
}

#[test]
fn test_page_past_the_end_is_empty() {
    let _guard = serial();
    setup();

    let page = items().paginate(10, 4).unwrap();
    assert!(page.is_empty());
    assert_eq!(page.total(), 25);
    assert_eq!(
        page.to_json(),
        json!({"items": [], "total": 25, "per_page": 10, "current_page": 4, "last_page": 2})
    );
}

#[test]
fn test_in_memory_paginate_matches_sql_paginate() {
    let _guard = serial();
    setup();

    let all = items().order_by("id").get().unwrap();
    let in_memory = all.paginate(10, 2);
    let from_sql = items().order_by("id").paginate(10, 2).unwrap();

    assert_eq!(in_memory.items(), from_sql.items());
    assert_eq!(in_memory.total(), from_sql.total());
    assert_eq!(in_memory.last_page(), from_sql.last_page());
}

#[test]
fn test_huge_page_numbers_saturate() {
    let _guard = serial();
    setup();

    let far = items().order_by("id").paginate(10, i64::MAX).unwrap();
    assert!(far.is_empty());
    assert_eq!(far.total(), 25);
    assert_eq!(far.current_page(), i64::MAX as u64);
    assert_eq!(
        statements(CONNECTION)[1],
        format!("SELECT * FROM items ORDER BY `id` LIMIT {}, 10", i64::MAX)
    );

    let wide = items().order_by("id").paginate(u64::MAX, 1).unwrap();
    assert_eq!(wide.len(), 25);

    let all = items().order_by("id").get().unwrap();
    assert!(all.paginate(10, i64::MAX).is_empty());
    assert!(all.paginate(u64::MAX, 3).is_empty());
}
