use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::app_state::AppState;
use crate::db;
use crate::error::{AppError, AppResult};

pub async fn health(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    db::ping(&state.db_pool)
        .await
        .map_err(AppError::ServiceUnavailable)?;
    Ok(Json(json!({ "status": "ok" })))
}
