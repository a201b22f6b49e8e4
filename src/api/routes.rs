//! Request handlers for the `/api/v1` routes

use super::{auth, spawn_pipeline, AppState};
use crate::storage::{SqliteStorage, Storage, StorageError, StoredBook};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::MutexGuard;

/// Errors returned to API clients as `{"error": "..."}`
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Storage(String),
    Unauthorized,
    Conflict,
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Storage(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Storage(message) => {
                tracing::error!("Storage read failed: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": message })),
                )
                    .into_response()
            }
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                Json(json!({ "error": "missing or invalid bearer token" })),
            )
                .into_response(),
            ApiError::Conflict => (
                StatusCode::CONFLICT,
                Json(json!({ "error": "a crawl is already in progress" })),
            )
                .into_response(),
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn storage(state: &AppState) -> ApiResult<MutexGuard<'_, SqliteStorage>> {
    state
        .storage
        .lock()
        .map_err(|_| ApiError::Storage("storage lock poisoned".to_string()))
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "catalog-harvest api" }))
}

pub async fn list_books(State(state): State<AppState>) -> ApiResult<Json<Vec<StoredBook>>> {
    let books = storage(&state)?.list_books()?;
    Ok(Json(books))
}

pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<StoredBook>> {
    storage(&state)?
        .get_book(id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("book {} not found", id)))
}

/// Query string of `/books/search`; empty values count as absent
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub title: Option<String>,
    pub category: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub async fn search_books(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<StoredBook>>> {
    let books =
        storage(&state)?.search_books(non_empty(&params.title), non_empty(&params.category))?;
    Ok(Json(books))
}

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    let categories = storage(&state)?.list_categories()?;
    Ok(Json(categories))
}

/// Reports API and database status; never fails
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let crawl_in_progress = state.crawl_lock.try_lock().is_err();

    let (db_status, book_count, last_run) = match storage(&state) {
        Ok(db) => match db.ping().and_then(|_| db.count_books()) {
            Ok(count) => ("ok".to_string(), Some(count), db.get_latest_run().ok().flatten()),
            Err(e) => (format!("error: {}", e), None, None),
        },
        Err(_) => ("error: storage lock poisoned".to_string(), None, None),
    };

    Json(json!({
        "api_status": "ok",
        "db_status": db_status,
        "book_count": book_count,
        "crawl_in_progress": crawl_in_progress,
        "last_run": last_run,
    }))
}

/// Starts a background pipeline run
pub async fn trigger_crawl(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let claims = match auth::authorize(&headers, state.config.api.jwt_secret.as_deref()) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!("Rejected crawl trigger: {}", e);
            return Err(ApiError::Unauthorized);
        }
    };

    let guard = state
        .crawl_lock
        .clone()
        .try_lock_owned()
        .map_err(|_| ApiError::Conflict)?;

    tracing::info!("Crawl triggered through the API by {}", claims.sub);
    spawn_pipeline(state.config.clone(), state.config_hash.clone(), guard);

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "crawl started" })),
    ))
}
