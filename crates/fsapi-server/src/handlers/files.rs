//! File handlers
//!
//! Each handler runs exactly one engine operation and maps its outcome to
//! a status code. Mutating routes other than delete first check that the
//! addressed path exists.

use crate::error::ApiError;
use crate::extractors::FilePath;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fsapi_core::{
    ContentAction, ContentCreation, ContentError, ContentMove, DeletionResult, EntryStats,
    RawContentAction, VirtualPath,
};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: EntryStats,
}

async fn require_existing(state: &AppState, path: &VirtualPath) -> Result<(), ApiError> {
    if state.engine.exists(path).await {
        Ok(())
    } else {
        Err(ApiError::file_not_found())
    }
}

pub async fn get_content(
    State(state): State<AppState>,
    FilePath(path): FilePath,
) -> Result<Response, ApiError> {
    match state.engine.get_content(&path).await? {
        Some(content) => Ok(Json(content).into_response()),
        None => Err(ApiError::file_not_found()),
    }
}

pub async fn create_content(
    State(state): State<AppState>,
    FilePath(path): FilePath,
    Json(req): Json<ContentCreation>,
) -> Result<(StatusCode, Json<StatsResponse>), ApiError> {
    require_existing(&state, &path).await?;

    info!("create {:?} '{}' in {}", req.entry_type, req.name, path);
    let stats = state.engine.create_content(&path, &req).await?;
    Ok((StatusCode::CREATED, Json(StatsResponse { stats })))
}

pub async fn perform_action(
    State(state): State<AppState>,
    FilePath(path): FilePath,
    Json(raw): Json<RawContentAction>,
) -> Result<Json<StatsResponse>, ApiError> {
    let action = ContentAction::try_from(raw)?;
    require_existing(&state, &path).await?;

    info!("action {:?} on {}", action, path);
    let stats = state.engine.perform_content_action(&path, &action).await?;
    Ok(Json(StatsResponse { stats }))
}

pub async fn move_content(
    State(state): State<AppState>,
    FilePath(path): FilePath,
    Json(req): Json<ContentMove>,
) -> Result<Json<StatsResponse>, ApiError> {
    require_existing(&state, &path).await?;

    info!("move {} to {}", path, req.path);
    let stats = state.engine.move_content(&path, &req.path).await?;
    Ok(Json(StatsResponse { stats }))
}

pub async fn delete_content(
    State(state): State<AppState>,
    FilePath(path): FilePath,
) -> Result<Response, ApiError> {
    info!("delete {}", path);
    match state.engine.delete_content(&path).await {
        Ok(()) => Ok(Json(DeletionResult {
            success: true,
            error: None,
        })
        .into_response()),
        Err(e) if e.is_fault() || matches!(e, ContentError::InvalidPath(_)) => Err(e.into()),
        Err(e) => Ok((
            StatusCode::CONFLICT,
            Json(DeletionResult {
                success: false,
                error: Some(e.to_string()),
            }),
        )
            .into_response()),
    }
}
