#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tempfile::TempDir;
use uuid::Uuid;

use surveyor::auth::password;
use surveyor::config::{Config, StorageBackend};
use surveyor::storage::{self, Stores};

/// A running test server backed by a temporary data directory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub dir: TempDir,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn responses_file(&self) -> std::path::PathBuf {
        self.dir.path().join("survey_responses.csv")
    }

    /// Submit a JSON survey, return (body, status).
    pub async fn save(&self, data: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/save"))
            .json(data)
            .send()
            .await
            .expect("save request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Submit form-urlencoded data, return (body, status).
    pub async fn save_form(&self, data: &[(&str, &str)]) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/save"))
            .form(data)
            .send()
            .await
            .expect("save form request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn login(&self, user: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/login"))
            .json(&json!({ "user": user, "password": password }))
            .send()
            .await
            .expect("login request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn get_json(&self, path: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

/// Write a `user,password_hash` credential file.
pub fn write_users(path: &Path, users: &[(&str, &str)]) {
    let mut out = String::from("user,password_hash\n");
    for (user, pw) in users {
        let hash = password::hash(pw).expect("hash password");
        out.push_str(&format!("{user},{hash}\n"));
    }
    std::fs::write(path, out).expect("write users file");
}

/// Spawn a file-backed test app in a fresh temporary directory.
pub async fn spawn_app() -> TestApp {
    spawn_app_with_users(&[]).await
}

pub async fn spawn_app_with_users(users: &[(&str, &str)]) -> TestApp {
    let dir = TempDir::new().expect("create temp dir");
    let config = Config::for_data_dir(dir.path());
    if !users.is_empty() {
        write_users(&config.users_file, users);
    }

    let stores = storage::open(&config).await.expect("open file storage");
    serve(stores, config, dir).await
}

pub async fn serve(stores: Stores, config: Config, dir: TempDir) -> TestApp {
    let (app, _state) = surveyor::build_app(stores, config);

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        client: Client::new(),
        dir,
    }
}

/// A throwaway Postgres database. Only available when DATABASE_URL is set.
pub struct TestDb {
    pub pool: PgPool,
    pub url: String,
    pub db_name: String,
}

fn admin_url(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.to_string())
}

/// Create a fresh database, or `None` when no Postgres server is configured.
pub async fn test_db() -> Option<TestDb> {
    let _ = dotenvy::dotenv();
    let Ok(base_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping postgres test");
        return None;
    };

    let db_name = format!(
        "surveyor_test_{}",
        Uuid::now_v7().to_string().replace('-', "")
    );

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");
    admin_pool.close().await;

    let url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    Some(TestDb { pool, url, db_name })
}

/// Spawn a Postgres-backed test app, or `None` when no server is configured.
pub async fn spawn_pg_app(users: &[(&str, &str)]) -> Option<(TestApp, TestDb)> {
    let db = test_db().await?;
    let dir = TempDir::new().expect("create temp dir");

    let mut config = Config::for_data_dir(dir.path());
    config.storage = StorageBackend::Postgres {
        database_url: db.url.clone(),
    };

    let stores = storage::open(&config).await.expect("open postgres storage");
    for (user, pw) in users {
        sqlx::query("INSERT INTO survey_users (username, password_hash) VALUES ($1, $2)")
            .bind(user)
            .bind(password::hash(pw).expect("hash password"))
            .execute(&db.pool)
            .await
            .expect("insert test user");
    }

    Some((serve(stores, config, dir).await, db))
}

/// Drop the test database after a test completes.
pub async fn cleanup_db(db: TestDb) {
    let TestDb { pool, url, db_name } = db;
    pool.close().await;

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&url))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
