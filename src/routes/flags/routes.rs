use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use uuid::Uuid;

use super::EvaluateResponse;
use crate::evaluation::UserContext;
use crate::state::AppState;
use crate::store::{FlagPatch, NewFlag};

/// Create a new feature flag
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<NewFlag>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let flag = state.flags.create_flag(payload).await?;
    Ok((StatusCode::CREATED, Json(flag)))
}

/// List all flags
pub async fn list(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let flags = state.flags.all_flags().await?;
    Ok(Json(flags))
}

/// Get a single flag by ID
pub async fn get(
    State(state): State<AppState>,
    Path(flag_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let flag = state.flags.get_flag_by_id(flag_id).await?;
    Ok(Json(flag))
}

/// Update a feature flag
pub async fn update(
    State(state): State<AppState>,
    Path(flag_id): Path<Uuid>,
    Json(payload): Json<FlagPatch>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let flag = state.flags.update_flag(flag_id, payload).await?;
    Ok(Json(flag))
}

/// Delete a feature flag, replying with the deleted flag
pub async fn delete(
    State(state): State<AppState>,
    Path(flag_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let flag = state.flags.delete_flag(flag_id).await?;
    Ok(Json(flag))
}

/// Toggle a flag's enabled state
pub async fn toggle(
    State(state): State<AppState>,
    Path(flag_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let flag = state.flags.toggle_flag(flag_id).await?;
    Ok(Json(flag))
}

/// Evaluate a flag by name for the user in the body
pub async fn evaluate(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(user): Json<UserContext>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let evaluation = state.flags.evaluate(&name, &user).await?;
    Ok(Json(EvaluateResponse::new(&name, evaluation)))
}
