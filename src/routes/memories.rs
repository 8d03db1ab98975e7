use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::error::AppError;
use crate::models::{
    ListParams, ListQuery, Memory, MemoryPatch, NewMemory, SearchCriteria, SearchParams,
};
use crate::routes::health::Message;
use crate::AppState;

#[derive(Serialize)]
struct Created {
    message: &'static str,
    memory: Memory,
}

#[derive(Serialize)]
struct Single {
    memory: Memory,
}

#[derive(Serialize)]
struct Many {
    memories: Vec<Memory>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/memory", post(create_memory))
        .route("/memories", get(list_memories))
        .route("/memories/search", get(search_memories))
        .route(
            "/memories/{id}",
            get(get_memory).put(update_memory).delete(delete_memory),
        )
}

/// Ids that are not integers cannot name a memory.
fn parse_id(id: &str) -> Result<i64, AppError> {
    id.parse().map_err(|_| AppError::NotFound)
}

async fn create_memory(
    State(state): State<AppState>,
    payload: Result<Json<NewMemory>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(new) = payload?;
    let memory = state.store.create(new).await?;

    Ok((
        StatusCode::CREATED,
        Json(Created {
            message: "Memory created",
            memory,
        }),
    ))
}

async fn list_memories(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = state.store.list(&ListQuery::from(params)).await?;
    Ok(Json(page))
}

async fn get_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let memory = state.store.get(parse_id(&id)?).await?;
    Ok(Json(Single { memory }))
}

async fn update_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<MemoryPatch>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let Json(patch) = payload?;
    let memory = state.store.update(id, patch).await?;
    Ok(Json(Single { memory }))
}

async fn delete_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.store.delete(parse_id(&id)?).await?;
    Ok(Json(Message {
        message: "Memory deleted",
    }))
}

async fn search_memories(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let criteria = SearchCriteria::try_from(params)?;
    let memories = state.store.search(&criteria).await?;
    Ok(Json(Many { memories }))
}
