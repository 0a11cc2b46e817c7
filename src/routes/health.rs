use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::SharedState;

pub async fn health(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({ "status": "ok", "service": state.config.service_name }))
}

/// Ready only while the store answers.
pub async fn ready(State(state): State<SharedState>) -> Result<Json<Value>, AppError> {
    state
        .users
        .ping()
        .await
        .map_err(|_| AppError::ServiceUnavailable("Store unavailable".to_string()))?;

    Ok(Json(json!({ "status": "ready" })))
}
