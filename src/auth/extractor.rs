use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::auth::jwt::{self, Claims};
use crate::error::AppError;
use crate::models::TenantId;
use crate::state::SharedState;

pub const TENANT_HEADER: &str = "x-tenant-id";

/// Authenticated caller and the tenant every operation is scoped to.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub tenant: TenantId,
}

impl AuthContext {
    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// Tenant resolution order: token claim, then the `X-Tenant-ID` header,
    /// then the default tenant. The fallbacks are a convenience for
    /// single-tenant deployments and must not be relied on for isolation.
    fn from_claims(claims: Claims, parts: &Parts) -> Self {
        let tenant = claims
            .tid
            .filter(|tid| !tid.trim().is_empty())
            .or_else(|| {
                parts
                    .headers
                    .get(TENANT_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(str::to_string)
            })
            .map(TenantId::from)
            .unwrap_or_default();

        AuthContext {
            user_id: claims.sub,
            tenant,
        }
    }
}

impl FromRequestParts<SharedState> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        // Bearer token first, then the access_token cookie
        if let Some(auth_header) = parts.headers.get("authorization") {
            let auth_str = auth_header
                .to_str()
                .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                let claims = jwt::decode_token(token, &state.config.jwt_secret)
                    .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;
                return Ok(AuthContext::from_claims(claims, parts));
            }
        }

        let jar = CookieJar::from_headers(&parts.headers);
        if let Some(cookie) = jar.get("access_token") {
            let claims = jwt::decode_token(cookie.value(), &state.config.jwt_secret)
                .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;
            return Ok(AuthContext::from_claims(claims, parts));
        }

        Err(AppError::Unauthorized(
            "Missing authentication token".to_string(),
        ))
    }
}
