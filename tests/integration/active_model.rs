//! Integration tests for schema-bound records: save, dirty tracking, JSON fields,
//! delete and on-demand relation resolution.

mod common;

use common::{fresh_database, serial, statements};
use lifebuoy::{Entity, ModelSchema, OrmError, Record, RelationDef, Related, SaveOutcome};
use once_cell::sync::Lazy;
use serde_json::json;

const CONNECTION: &str = "models";

const SCHEMA: &str = "
    CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, email TEXT, settings TEXT);
    CREATE TABLE posts (id INTEGER PRIMARY KEY AUTOINCREMENT, user_id INTEGER, title TEXT);
";

struct User;
struct Post;

fn unpersistable() -> ModelSchema {
    ModelSchema::builder("").build()
}

static USERS: Lazy<ModelSchema> = Lazy::new(|| {
    ModelSchema::builder("users")
        .connection(CONNECTION)
        .json_fields(["settings"])
        .has_many::<Post>("posts", "user_id", "id")
        .relation(RelationDef::has_many("ghosts", unpersistable, "user_id", "id"))
        .build()
});

static POSTS: Lazy<ModelSchema> = Lazy::new(|| {
    ModelSchema::builder("posts")
        .connection(CONNECTION)
        .belongs_to::<User>("author", "user_id", "id")
        .build()
});

impl Entity for User {
    fn schema() -> ModelSchema {
        USERS.clone()
    }
}

impl Entity for Post {
    fn schema() -> ModelSchema {
        POSTS.clone()
    }
}

fn setup() {
    fresh_database(CONNECTION, SCHEMA);
}

fn seeded_user() -> Record {
    let user = User::create(json!({
        "name": "Ann",
        "email": "ann@example.com",
        "settings": {"theme": "dark", "tabs": [1, 2]}
    }))
    .unwrap()
    .unwrap();
    lifebuoy::QueryLog::reset();
    user
}

#[test]
fn test_new_record_save_inserts_and_adopts_key() {
    let _guard = serial();
    setup();

    let mut user = User::new_record(json!({"name": "Ann", "email": "ann@example.com"})).unwrap();
    assert!(!user.is_persisted());

    let outcome = user.save().unwrap();
    assert_eq!(outcome, SaveOutcome::Inserted(json!(1)));
    assert_eq!(user.get("id"), Some(&json!(1)));
    assert!(user.is_persisted());

    assert_eq!(user.save().unwrap(), SaveOutcome::Unchanged);
    assert_eq!(
        statements(CONNECTION),
        vec!["INSERT INTO users (`name`, `email`) VALUES (?, ?)".to_string()]
    );
}

#[test]
fn test_unchanged_save_issues_no_statement() {
    let _guard = serial();
    setup();
    seeded_user();

    let mut user = User::find(1).unwrap().unwrap();
    let reads = statements(CONNECTION).len();

    assert_eq!(user.save().unwrap(), SaveOutcome::Unchanged);
    assert_eq!(statements(CONNECTION).len(), reads);
}

#[test]
fn test_single_field_change_updates_only_that_field() {
    let _guard = serial();
    setup();
    seeded_user();

    let mut user = User::find(1).unwrap().unwrap();
    user.set("email", "ann@example.org");
    assert_eq!(user.dirty_attributes().len(), 1);

    lifebuoy::QueryLog::reset();
    assert_eq!(user.save().unwrap(), SaveOutcome::Updated(1));

    let log = lifebuoy::QueryLog::entries_for(CONNECTION);
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].sql, "UPDATE users SET `email` = ? WHERE `id` = ?");
    assert_eq!(log[0].values, vec![json!("ann@example.org"), json!(1)]);

    assert_eq!(user.save().unwrap(), SaveOutcome::Unchanged);
    assert_eq!(lifebuoy::QueryLog::entries_for(CONNECTION).len(), 1);

    let reloaded = User::find(1).unwrap().unwrap();
    assert_eq!(reloaded.get("email"), Some(&json!("ann@example.org")));
}

#[test]
fn test_json_field_round_trip() {
    let _guard = serial();
    setup();
    seeded_user();

    let mut user = User::find(1).unwrap().unwrap();
    assert_eq!(user.get("settings"), Some(&json!({"theme": "dark", "tabs": [1, 2]})));
    assert_eq!(user.lookup("settings.tabs.1"), Some(json!(2)));

    // Rebuilding the structure with identical content is not a change.
    user.set("settings", json!({"theme": "dark", "tabs": [1, 2]}));
    lifebuoy::QueryLog::reset();
    assert_eq!(user.save().unwrap(), SaveOutcome::Unchanged);
    assert!(statements(CONNECTION).is_empty());

    user.set("settings", json!({"theme": "light", "tabs": [1, 2]}));
    assert_eq!(user.save().unwrap(), SaveOutcome::Updated(1));
    let log = lifebuoy::QueryLog::entries_for(CONNECTION);
    assert_eq!(log[0].sql, "UPDATE users SET `settings` = ? WHERE `id` = ?");
    assert_eq!(log[0].values[0], json!(r#"{"theme":"light","tabs":[1,2]}"#));

    let reloaded = User::find(1).unwrap().unwrap();
    assert_eq!(reloaded.lookup("settings.theme"), Some(json!("light")));
}

#[test]
fn test_relation_fields_are_not_written() {
    let _guard = serial();
    setup();
    seeded_user();
    Post::create(json!({"user_id": 1, "title": "first"})).unwrap();

    let mut user = User::find(1).unwrap().unwrap();
    assert!(user.load("posts").unwrap());
    user.set("posts", json!("not a column"));
    assert!(user.dirty_attributes().is_empty());

    lifebuoy::QueryLog::reset();
    assert_eq!(user.save().unwrap(), SaveOutcome::Unchanged);
    assert!(statements(CONNECTION).is_empty());
}

#[test]
fn test_delete_record() {
    let _guard = serial();
    setup();
    seeded_user();

    let mut user = User::find(1).unwrap().unwrap();
    assert_eq!(user.delete().unwrap(), 1);
    assert!(!user.is_persisted());
    assert!(User::find(1).unwrap().is_none());
}

#[test]
fn test_unbound_record_is_not_persistable() {
    let mut record = Record::from_json(json!({"id": 1, "name": "Ann"})).unwrap();
    assert_eq!(record.save().unwrap_err(), OrmError::NotPersistable);
    assert_eq!(record.delete().unwrap_err(), OrmError::NotPersistable);
    assert!(record.query().is_err());
}

#[test]
fn test_lazy_relations() {
    let _guard = serial();
    setup();
    seeded_user();
    Post::create(json!({"user_id": 1, "title": "first"})).unwrap();
    Post::create(json!({"user_id": 1, "title": "second"})).unwrap();
    Post::create(json!({"user_id": 2, "title": "orphan"})).unwrap();

    let user = User::find(1).unwrap().unwrap();
    let posts = user.related("posts").unwrap().unwrap();
    assert_eq!(posts.as_many().map(|p| p.len()), Some(2));
    assert!(user.related("comments").unwrap().is_none());

    let mut post = Post::find(1).unwrap().unwrap();
    assert!(post.load("author").unwrap());
    assert_eq!(post.lookup("author.name"), Some(json!("Ann")));

    let mut orphan = Post::find(3).unwrap().unwrap();
    orphan.load("author").unwrap();
    assert_eq!(orphan.relation("author"), Some(&Related::One(None)));
    assert_eq!(orphan.to_json()["author"], json!(null));
}

#[test]
fn test_relation_to_unpersistable_target() {
    let _guard = serial();
    setup();
    seeded_user();

    let user = User::find(1).unwrap().unwrap();
    assert_eq!(
        user.related("ghosts").unwrap_err(),
        OrmError::RelationTargetTypeInvalid("ghosts".to_string())
    );
    assert!(matches!(
        User::query().with(["ghosts"]).get(),
        Err(OrmError::RelationTargetTypeInvalid(_))
    ));
}

#[test]
fn test_scoped_model_query() {
    let _guard = serial();
    setup();
    seeded_user();
    User::create(json!({"name": "Bob"})).unwrap();

    let user = User::find(2).unwrap().unwrap();
    let names = user.query().unwrap().order_by("name").get().unwrap().pluck("name");
    assert_eq!(names, vec![json!("Ann"), json!("Bob")]);
    assert_eq!(User::all().unwrap().len(), 2);
}
