//! resources.rs
//!
//! Пять операций CRUD, общие для мест и комнат. Ресурс задаётся типом `R`,
//! маршруты: `/{path}` и `/{path}/{key}`.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::{
    error::{ApiError, StoreError},
    middleware::FIELDS_HEADER,
    models::Resource,
    query::{self, ListQuery},
    services::jobs::Job,
    AppState,
};

pub fn routes<R: Resource>() -> Router<Arc<AppState>> {
    let collection = format!("/{}", R::PATH);
    let item = format!("/{}/{{{}}}", R::PATH, R::KEY);
    Router::new()
        .route(&collection, get(list::<R>).post(create::<R>))
        .route(&item, get(fetch::<R>).put(update::<R>).delete(remove::<R>))
}

/* ---------- helpers ---------- */

/// Один дедлайн на все обращения к БД внутри запроса.
struct Deadline(Instant);

impl Deadline {
    fn after(timeout: Duration) -> Self {
        Deadline(Instant::now() + timeout)
    }

    async fn run<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout_at(self.0, fut)
            .await
            .map_err(|_| StoreError::Timeout)?
    }
}

fn parse_key<R: Resource>(raw: &str) -> Result<i32, ApiError> {
    raw.parse().map_err(|_| ApiError::BadRequest(R::INVALID_KEY.to_string()))
}

fn bad_body(err: serde_json::Error) -> ApiError {
    tracing::debug!("request body rejected: {}", err);
    ApiError::BadRequest("Некорректные данные запроса".to_string())
}

fn updated_job<R: Resource>(key: i32) -> Job {
    let mut data = Map::new();
    data.insert(R::KEY.to_string(), Value::from(key));
    data.insert("time".to_string(), Value::from(chrono::Utc::now().to_rfc3339()));
    Job::new(R::UPDATED_JOB, data)
}

/* ---------- handlers ---------- */

// GET /{path}
async fn list<R: Resource>(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Map<String, Value>>>, ApiError> {
    let fields = headers.get(FIELDS_HEADER).and_then(|v| v.to_str().ok());
    let list_query = ListQuery::build::<R>(fields, &params);

    let deadline = Deadline::after(state.config.database.query_timeout);
    let rows = deadline.run(R::repository(&state).list(&list_query)).await?;

    Ok(Json(rows))
}

// GET /{path}/{key}
async fn fetch<R: Resource>(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<R>, ApiError> {
    let key = parse_key::<R>(&key)?;
    let deadline = Deadline::after(state.config.database.query_timeout);

    match deadline.run(R::repository(&state).get(key)).await? {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::NotFound(R::NOT_FOUND.to_string())),
    }
}

// POST /{path}
async fn create<R: Resource>(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<R>), ApiError> {
    let mut record: R = serde_json::from_slice(&body).map_err(bad_body)?;
    record.apply_defaults();

    let deadline = Deadline::after(state.config.database.query_timeout);
    match deadline.run(R::repository(&state).insert(&record)).await {
        Ok(created) => Ok((StatusCode::CREATED, Json(created))),
        Err(StoreError::Duplicate(detail)) => {
            tracing::warn!("create {} rejected: {}", R::PATH, detail);
            Err(ApiError::BadRequest(R::DUPLICATE.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

// PUT /{path}/{key}: частичное обновление
async fn update<R: Resource>(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    body: Bytes,
) -> Result<Json<R>, ApiError> {
    let key = parse_key::<R>(&key)?;
    let body: Map<String, Value> = serde_json::from_slice(&body).map_err(bad_body)?;
    let changes = query::parse_update::<R>(key, body)?;

    let deadline = Deadline::after(state.config.database.query_timeout);
    let repo = R::repository(&state);

    let affected = deadline.run(repo.update(key, &changes)).await?;
    if affected == 0 {
        return Err(ApiError::NotFound(R::NOT_FOUND.to_string()));
    }

    state.notifier.notify(updated_job::<R>(key));

    match deadline.run(repo.get(key)).await? {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::NotFound(R::NOT_FOUND.to_string())),
    }
}

// DELETE /{path}/{key}: без проверки существования
async fn remove<R: Resource>(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    let key = parse_key::<R>(&key)?;
    let deadline = Deadline::after(state.config.database.query_timeout);

    let affected = deadline.run(R::repository(&state).delete(key)).await?;
    tracing::debug!("delete {} {}: {} rows", R::PATH, key, affected);
    Ok(StatusCode::NO_CONTENT)
}
