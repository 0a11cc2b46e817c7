use thiserror::Error;

use crate::db::StoreError;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user not found")]
    NotFound,

    #[error("user already exists")]
    Exists,

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type UserResult<T> = Result<T, UserError>;
