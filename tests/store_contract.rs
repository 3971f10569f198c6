//! The same contract suite run against every response store backend.

mod common;

use serde_json::json;
use tempfile::TempDir;

use surveyor::models::{Answer, Answers, NewResponse, ResponseRecord};
use surveyor::storage::{FileResponseStore, PgResponseStore, ResponseStore};

fn answers(value: serde_json::Value) -> Answers {
    serde_json::from_value(value).expect("answers fixture")
}

fn response(name: Option<&str>, date: Option<&str>, value: serde_json::Value, comment: &str) -> NewResponse {
    NewResponse {
        name: name.map(str::to_string),
        date: date.map(str::to_string),
        answers: answers(value),
        comment: comment.to_string(),
    }
}

fn fixtures() -> Vec<NewResponse> {
    vec![
        response(Some("Ana"), Some("2024-05-01"), json!({ "q1": 4, "q2": "yes" }), "great"),
        response(None, None, json!({ "q2": "", "q3": 2.5 }), ""),
        response(Some(""), Some("ayer"), json!({ "q1": "5", "q4": "a, \"quoted\"\nline" }), "multi\nline"),
        response(Some("Luis"), Some("2024-05-02"), json!({}), ""),
        response(Some("a\0b"), Some("\0"), json!({ "q\05": "x\0y" }), "c\0"),
    ]
}

async fn run_contract(store: &dyn ResponseStore) {
    // Never written: empty, not an error
    assert!(store.list_all().await.unwrap().is_empty());

    let mut appended: Vec<ResponseRecord> = Vec::new();
    for new in fixtures() {
        appended.push(store.append(&new).await.unwrap());
    }

    let listed = store.list_all().await.unwrap();
    assert_eq!(listed.len(), 5, "{} lost records", store.kind());
    assert_eq!(listed, appended, "{} list differs from appends", store.kind());

    // Ids are unique and increasing in insertion order
    assert!(listed.windows(2).all(|w| w[0].id < w[1].id));

    // Text and numbers keep their type, empty text stays distinct from absent
    assert_eq!(listed[0].answers["q1"], Answer::Number(4.into()));
    assert_eq!(listed[0].answers["q2"], Answer::Text("yes".to_string()));
    assert_eq!(listed[1].answers["q2"], Answer::Text(String::new()));
    assert!(!listed[1].answers.contains_key("q1"));
    assert_eq!(listed[2].answers["q1"], Answer::Text("5".to_string()));
    assert_eq!(listed[2].answers["q4"], Answer::Text("a, \"quoted\"\nline".to_string()));
    assert!(listed[3].answers.is_empty());

    // Optional identity fields
    assert_eq!(listed[1].name, None);
    assert_eq!(listed[2].name.as_deref(), Some(""));
    assert_eq!(listed[2].comment, "multi\nline");

    // NUL characters never reach the medium
    assert_eq!(listed[4].name.as_deref(), Some("ab"));
    assert_eq!(listed[4].date.as_deref(), Some(""));
    assert_eq!(listed[4].answers["q5"], Answer::Text("xy".to_string()));
    assert_eq!(listed[4].comment, "c");
}

async fn run_reserved_keys(store: &dyn ResponseStore) {
    let new = response(Some("Ana"), None, json!({ "name": "x", "Comment": "y", "q1": 1 }), "");
    let stored = store.append(&new).await.unwrap();

    let listed = store.list_all().await.unwrap();
    assert_eq!(listed, vec![stored]);
    assert_eq!(listed[0].name.as_deref(), Some("Ana"));
    assert_eq!(listed[0].answers.keys().collect::<Vec<_>>(), vec!["q1"]);
}

#[tokio::test]
async fn file_store_contract() {
    let dir = TempDir::new().unwrap();
    let store = FileResponseStore::new(dir.path().join("nested").join("responses.csv"));
    store.init().await.unwrap();

    run_contract(&store).await;
}

#[tokio::test]
async fn file_store_drops_reserved_keys() {
    let dir = TempDir::new().unwrap();
    let store = FileResponseStore::new(dir.path().join("responses.csv"));

    run_reserved_keys(&store).await;
}

#[tokio::test]
async fn file_store_creates_file_on_first_append() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("responses.csv");
    let store = FileResponseStore::new(&path);

    assert!(store.list_all().await.unwrap().is_empty());
    assert!(!path.exists());

    store
        .append(&response(Some("Ana"), None, json!({ "q1": 3 }), ""))
        .await
        .unwrap();
    assert!(path.exists());

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text, "id,name,date,comment,q1\n1,\"Ana\",,\"\",3\n");
}

#[tokio::test]
async fn file_store_widens_header_for_new_questions() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("responses.csv");
    let store = FileResponseStore::new(&path);

    store.append(&response(None, None, json!({ "q1": 1 }), "")).await.unwrap();
    store.append(&response(None, None, json!({ "q2": "b" }), "")).await.unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        text,
        "id,name,date,comment,q1,q2\n1,,,\"\",1,\n2,,,\"\",,\"b\"\n"
    );
}

#[tokio::test]
async fn file_store_rejects_corrupt_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("responses.csv");
    std::fs::write(&path, "id,name,date,comment,q1\n1,\"Ana\n").unwrap();

    let store = FileResponseStore::new(&path);
    assert!(store.list_all().await.is_err());
    assert!(store.append(&NewResponse::default()).await.is_err());
}

#[tokio::test]
async fn file_store_rejects_duplicate_header_columns() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("responses.csv");
    std::fs::write(&path, "id,name,date,comment,q1,q1\n1,,,\"\",1,2\n").unwrap();

    let store = FileResponseStore::new(&path);
    assert!(store.list_all().await.is_err());
}

#[tokio::test]
async fn file_store_serializes_concurrent_appends() {
    let dir = TempDir::new().unwrap();
    let store = std::sync::Arc::new(FileResponseStore::new(dir.path().join("responses.csv")));

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .append(&response(None, None, json!({ (format!("q{i}")): i }), ""))
                    .await
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let listed = store.list_all().await.unwrap();
    let ids: Vec<i64> = listed.iter().map(|r| r.id).collect();
    assert_eq!(ids, (1..=10).collect::<Vec<_>>());
}

#[tokio::test]
async fn postgres_store_contract() {
    let Some(db) = common::test_db().await else {
        return;
    };

    let store = PgResponseStore::new(db.pool.clone());
    // Table not created yet
    assert!(store.list_all().await.unwrap().is_empty());
    store.init().await.unwrap();
    // Idempotent
    store.init().await.unwrap();

    run_contract(&store).await;

    common::cleanup_db(db).await;
}

#[tokio::test]
async fn postgres_store_drops_reserved_keys() {
    let Some(db) = common::test_db().await else {
        return;
    };

    let store = PgResponseStore::new(db.pool.clone());
    store.init().await.unwrap();
    run_reserved_keys(&store).await;

    common::cleanup_db(db).await;
}

#[tokio::test]
async fn postgres_store_creates_table_on_first_append() {
    let Some(db) = common::test_db().await else {
        return;
    };

    let store = PgResponseStore::new(db.pool.clone());
    let stored = store
        .append(&response(Some("Ana"), None, json!({ "q1": 3 }), ""))
        .await
        .unwrap();
    assert_eq!(store.list_all().await.unwrap(), vec![stored]);

    common::cleanup_db(db).await;
}

#[tokio::test]
async fn postgres_store_recreates_dropped_table() {
    let Some(db) = common::test_db().await else {
        return;
    };

    let store = PgResponseStore::new(db.pool.clone());
    store.init().await.unwrap();
    sqlx::query("DROP TABLE survey_responses")
        .execute(&db.pool)
        .await
        .unwrap();

    // The migration is already recorded, the table is gone
    let stored = store
        .append(&response(Some("Ana"), None, json!({ "q1": 3 }), ""))
        .await
        .unwrap();
    assert_eq!(store.list_all().await.unwrap(), vec![stored]);

    common::cleanup_db(db).await;
}

#[tokio::test]
async fn backends_agree_on_same_appends() {
    let Some(db) = common::test_db().await else {
        return;
    };

    let dir = TempDir::new().unwrap();
    let file = FileResponseStore::new(dir.path().join("responses.csv"));
    let pg = PgResponseStore::new(db.pool.clone());
    pg.init().await.unwrap();

    for new in fixtures() {
        file.append(&new).await.unwrap();
        pg.append(&new).await.unwrap();
    }

    assert_eq!(file.list_all().await.unwrap(), pg.list_all().await.unwrap());

    common::cleanup_db(db).await;
}
