use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct Message {
    pub message: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(hello))
        .route("/test", get(test_route))
}

async fn hello() -> &'static str {
    "Hello World!"
}

async fn test_route() -> Json<Message> {
    Json(Message {
        message: "Test route",
    })
}
