#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use memories::store::MemoryStore;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
}

pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to create in-memory SQLite pool");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

impl TestApp {
    pub async fn new() -> Self {
        let pool = test_pool().await;
        let router = memories::build_app(pool.clone());

        Self { router, db: pool }
    }

    pub fn store(&self) -> MemoryStore {
        MemoryStore::new(self.db.clone())
    }

    /// Send a request through the app and return the response.
    pub async fn request(&self, req: Request<Body>) -> Response {
        tower::ServiceExt::oneshot(self.router.clone(), req)
            .await
            .unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.request(req).await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> Response {
        self.send_json("POST", uri, body).await
    }

    pub async fn put_json(&self, uri: &str, body: &Value) -> Response {
        self.send_json("PUT", uri, body).await
    }

    pub async fn delete(&self, uri: &str) -> Response {
        let req = Request::builder()
            .uri(uri)
            .method("DELETE")
            .body(Body::empty())
            .unwrap();
        self.request(req).await
    }

    async fn send_json(&self, method: &str, uri: &str, body: &Value) -> Response {
        let req = Request::builder()
            .uri(uri)
            .method(method)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.request(req).await
    }

    /// Create a memory through the API and return its id. `image` is sent
    /// as null when the body leaves it out.
    pub async fn create_memory(&self, mut body: Value) -> i64 {
        if body.get("image").is_none() {
            body["image"] = Value::Null;
        }
        let resp = self.post_json("/memory", &body).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let json = body_json(resp).await;
        json["memory"]["id"].as_i64().expect("created memory has an id")
    }

    pub async fn tag_count(&self, name: &str) -> i64 {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tag WHERE name = ?")
            .bind(name)
            .fetch_one(&self.db)
            .await
            .unwrap();
        count.0
    }
}

/// Read the full response body as a String.
pub async fn body_string(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(resp: Response) -> Value {
    serde_json::from_str(&body_string(resp).await).expect("response body is JSON")
}

/// Tag names of a serialized memory, sorted for order-independent asserts.
pub fn tag_names(memory: &Value) -> Vec<String> {
    let mut names: Vec<String> = memory["tags"]
        .as_array()
        .expect("tags is an array")
        .iter()
        .map(|t| t.as_str().unwrap().to_string())
        .collect();
    names.sort();
    names
}
