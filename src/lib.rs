pub mod config;
pub mod error;
pub mod extract;
pub mod state;
pub mod auth;
pub mod db;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::auth::password::PasswordHasher;
use crate::config::Config;
use crate::repository::UserRepository;
use crate::services::UserService;
use crate::state::{AppState, SharedState};

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Assemble the router over any repository. Fails only on unusable password
/// hashing parameters.
pub fn build_app(config: Config, repository: Arc<dyn UserRepository>) -> Result<Router, String> {
    let hasher = PasswordHasher::new(&config.password)?;

    let state: SharedState = Arc::new(AppState {
        users: UserService::new(repository, hasher),
        config,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(routes::api_routes())
        .merge(routes::health_routes())
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
                .layer(cors),
        )
        .with_state(state);

    Ok(app)
}
