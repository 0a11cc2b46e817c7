pub mod roles;
pub mod users;

use thiserror::Error;

/// Name of the per-tenant email uniqueness constraint on `users`.
pub const USERS_EMAIL_CONSTRAINT: &str = "users_tenant_email_key";

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint `{0}` violated")]
    UniqueViolation(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    pub fn is_unique_violation_of(&self, constraint: &str) -> bool {
        matches!(self, StoreError::UniqueViolation(name) if name == constraint)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::UniqueViolation(db_err.constraint().unwrap_or_default().to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}
