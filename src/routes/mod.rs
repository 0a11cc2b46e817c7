pub mod health;
pub mod users;

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/v1/users", get(users::list).post(users::create))
        .route("/api/v1/users/lookup", get(users::lookup))
        .route(
            "/api/v1/users/profile",
            get(users::get_profile).put(users::update_profile),
        )
        .route(
            "/api/v1/users/{id}",
            get(users::get).put(users::update).delete(users::delete),
        )
}

pub fn health_routes() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
}

/// Success envelope shared by every API handler.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data,
        })
    }
}
