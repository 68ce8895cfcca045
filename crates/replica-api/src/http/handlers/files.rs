//! Artifact file endpoints.
//!
//! GET /files/tree            - every file under the output directory
//! GET /files/content?path=   - text content of one file

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::{Value, json};

use replica_core::artifact::ArtifactStore;

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ContentQuery {
    pub path: String,
}

/// GET /files/tree - Relative paths of every regular file, sorted.
pub async fn file_tree(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let tree = state.store.list_files().await?;
    Ok(Json(json!({ "tree": tree })))
}

/// GET /files/content - One file's text, 404 when missing or not a regular file.
pub async fn file_content(
    State(state): State<AppState>,
    Query(query): Query<ContentQuery>,
) -> Result<Json<Value>, AppError> {
    let content = state.store.read_file(&query.path).await?;
    Ok(Json(json!({ "content": content })))
}
