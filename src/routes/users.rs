use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::auth::extractor::AuthContext;
use crate::error::AppError;
use crate::extract::{UuidPath, ValidatedJson, ValidatedQuery};
use crate::models::{
    CreateUser, UpdateProfile, UpdateUser, UserListResponse, UserQuery, UserResponse, UserSort,
    UserStatus,
};
use crate::routes::ApiResponse;
use crate::state::SharedState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[serde(default)]
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 2, max = 50, message = "must be between 2 and 50 characters"))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(min = 2, max = 50, message = "must be between 2 and 50 characters"))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
    #[validate(custom(function = "validate_status"))]
    pub status: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "validate_role_ids"))]
    pub role_ids: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 2, max = 50, message = "must be between 2 and 50 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 2, max = 50, message = "must be between 2 and 50 characters"))]
    pub last_name: Option<String>,
    #[validate(custom(function = "validate_status"))]
    pub status: Option<String>,
    #[validate(custom(function = "validate_role_ids"))]
    pub role_ids: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 50, message = "must be between 2 and 50 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 2, max = 50, message = "must be between 2 and 50 characters"))]
    pub last_name: Option<String>,
}

/// `GET /api/v1/users` query string. `role_ids` is comma separated; zero for
/// `page` or `limit` means the default.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListUsersParams {
    #[validate(range(min = 0, message = "must not be negative"))]
    pub page: Option<i64>,
    #[validate(range(min = 0, max = 100, message = "must be between 0 and 100"))]
    pub limit: Option<i64>,
    #[validate(custom(function = "validate_status_filter"))]
    pub status: Option<String>,
    pub search: Option<String>,
    #[validate(custom(function = "validate_role_id_list"))]
    pub role_ids: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LookupParams {
    #[serde(default)]
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
}

fn validate_status(status: &str) -> Result<(), ValidationError> {
    status
        .parse::<UserStatus>()
        .map(|_| ())
        .map_err(|_| {
            ValidationError::new("status").with_message("must be one of active, inactive, pending".into())
        })
}

fn validate_status_filter(status: &str) -> Result<(), ValidationError> {
    if status.trim().is_empty() {
        return Ok(());
    }
    validate_status(status.trim())
}

fn validate_role_ids(ids: &[String]) -> Result<(), ValidationError> {
    if ids.iter().all(|id| Uuid::parse_str(id).is_ok()) {
        Ok(())
    } else {
        Err(ValidationError::new("uuid").with_message("role IDs must be UUIDs".into()))
    }
}

fn validate_role_id_list(ids: &str) -> Result<(), ValidationError> {
    let ids: Vec<String> = split_list(ids).map(str::to_string).collect();
    validate_role_ids(&ids)
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|part| !part.is_empty())
}

/// Validation has already run, so anything unparseable here is dropped.
fn parse_role_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<Uuid> {
    ids.into_iter()
        .filter_map(|id| Uuid::parse_str(id).ok())
        .collect()
}

fn parse_status(status: Option<&str>) -> Option<UserStatus> {
    status.and_then(|s| s.trim().parse().ok())
}

impl From<CreateUserRequest> for CreateUser {
    fn from(req: CreateUserRequest) -> Self {
        Self {
            status: parse_status(req.status.as_deref()),
            role_ids: parse_role_ids(req.role_ids.iter().map(String::as_str)),
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            password: req.password,
        }
    }
}

impl From<UpdateUserRequest> for UpdateUser {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            status: parse_status(req.status.as_deref()),
            role_ids: req
                .role_ids
                .map(|ids| parse_role_ids(ids.iter().map(String::as_str))),
            first_name: req.first_name,
            last_name: req.last_name,
        }
    }
}

impl From<UpdateProfileRequest> for UpdateProfile {
    fn from(req: UpdateProfileRequest) -> Self {
        Self {
            first_name: req.first_name,
            last_name: req.last_name,
        }
    }
}

impl From<ListUsersParams> for UserQuery {
    fn from(params: ListUsersParams) -> Self {
        Self {
            page: params.page.unwrap_or_default(),
            limit: params.limit.unwrap_or_default(),
            status: parse_status(params.status.as_deref()),
            search: params.search,
            role_ids: params
                .role_ids
                .as_deref()
                .map(|ids| parse_role_ids(split_list(ids)))
                .unwrap_or_default(),
            sort: params
                .sort
                .as_deref()
                .map(UserSort::parse)
                .unwrap_or_default(),
        }
    }
}

pub async fn create(
    auth: AuthContext,
    State(state): State<SharedState>,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), AppError> {
    let user = state.users.create_user(auth.tenant(), req.into()).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("User created successfully", user),
    ))
}

pub async fn list(
    auth: AuthContext,
    State(state): State<SharedState>,
    ValidatedQuery(params): ValidatedQuery<ListUsersParams>,
) -> Result<Json<ApiResponse<UserListResponse>>, AppError> {
    let page = state.users.list_users(auth.tenant(), params.into()).await?;
    Ok(ApiResponse::ok("Users retrieved successfully", page))
}

pub async fn lookup(
    auth: AuthContext,
    State(state): State<SharedState>,
    ValidatedQuery(params): ValidatedQuery<LookupParams>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user = state
        .users
        .get_user_by_email(auth.tenant(), &params.email)
        .await?;
    Ok(ApiResponse::ok("User retrieved successfully", user))
}

pub async fn get(
    auth: AuthContext,
    State(state): State<SharedState>,
    UuidPath(id): UuidPath,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user = state.users.get_user(auth.tenant(), id).await?;
    Ok(ApiResponse::ok("User retrieved successfully", user))
}

pub async fn update(
    auth: AuthContext,
    State(state): State<SharedState>,
    UuidPath(id): UuidPath,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user = state
        .users
        .update_user(auth.tenant(), id, req.into())
        .await?;
    Ok(ApiResponse::ok("User updated successfully", user))
}

pub async fn delete(
    auth: AuthContext,
    State(state): State<SharedState>,
    UuidPath(id): UuidPath,
) -> Result<Json<ApiResponse<()>>, AppError> {
    state.users.delete_user(auth.tenant(), id).await?;
    Ok(ApiResponse::ok("User deleted successfully", ()))
}

pub async fn get_profile(
    auth: AuthContext,
    State(state): State<SharedState>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user = state.users.get_user(auth.tenant(), auth.user_id).await?;
    Ok(ApiResponse::ok("Profile retrieved successfully", user))
}

pub async fn update_profile(
    auth: AuthContext,
    State(state): State<SharedState>,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user = state
        .users
        .update_profile(auth.tenant(), auth.user_id, req.into())
        .await?;
    Ok(ApiResponse::ok("Profile updated successfully", user))
}
