//! Project endpoint handlers.

use axum::{
    Json,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::cache::InvalidationResult;
use crate::error::AppError;
use crate::extractors::ProjectPath;
use crate::state::AppState;

/// GET /project/{org}/{repo}
/// Devuelve el payload del proyecto, desde cache o desde el origen.
#[instrument(skip_all, fields(org = %path.org, repo = %path.repo))]
pub async fn get_project(
    State(state): State<AppState>,
    path: ProjectPath,
) -> Result<Response, AppError> {
    let value = state.coordinator().read(&path.org, &path.repo).await?;

    Ok((
        [(header::CONTENT_TYPE, "application/json")],
        value.to_vec(),
    )
        .into_response())
}

/// DELETE /project/{org}/{repo}
/// Invalida la entry en todos los tiers y avisa a las demas instancias.
#[instrument(skip_all, fields(org = %path.org, repo = %path.repo))]
pub async fn invalidate_project(
    State(state): State<AppState>,
    path: ProjectPath,
) -> Result<Json<InvalidationResult>, AppError> {
    let result = state
        .coordinator()
        .invalidate(&path.org, &path.repo)
        .await?;

    Ok(Json(result))
}
