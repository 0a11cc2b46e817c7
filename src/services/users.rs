use std::sync::Arc;

use uuid::Uuid;

use crate::auth::password::PasswordHasher;
use crate::db::{StoreError, USERS_EMAIL_CONSTRAINT};
use crate::models::{
    total_pages, CreateUser, NewUser, TenantId, UpdateProfile, UpdateUser, User, UserChanges,
    UserListResponse, UserQuery, UserResponse,
};
use crate::repository::UserRepository;

use super::{UserError, UserResult};

/// Business rules for users: per-tenant email uniqueness, password hashing,
/// existence checks before mutation, and response shaping.
///
/// The service holds no per-request state; concurrent callers only share the
/// repository.
#[derive(Clone)]
pub struct UserService {
    repository: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>, hasher: PasswordHasher) -> Self {
        Self { repository, hasher }
    }

    /// Create a user. The email lookup only short-circuits the common case;
    /// the store's unique constraint decides concurrent races, and its
    /// violation is reported as `UserError::Exists` too.
    pub async fn create_user(&self, tenant: &TenantId, input: CreateUser) -> UserResult<UserResponse> {
        let email = normalize_email(&input.email);

        let existing = self
            .repository
            .get_by_email(tenant, &email)
            .await
            .map_err(store_failure(tenant, "checking existing user"))?;
        if existing.is_some() {
            tracing::warn!(%tenant, %email, "User already exists");
            return Err(UserError::Exists);
        }

        let password_hash = self.hash_password(tenant, input.password).await?;

        let user = NewUser {
            id: Uuid::now_v7(),
            email,
            first_name: input.first_name,
            last_name: input.last_name,
            password_hash,
            status: input.status.unwrap_or_default(),
            role_ids: input.role_ids,
        };

        match self.repository.create(tenant, &user).await {
            Ok(()) => {}
            Err(err) if err.is_unique_violation_of(USERS_EMAIL_CONSTRAINT) => {
                tracing::warn!(%tenant, email = %user.email, "User created concurrently");
                return Err(UserError::Exists);
            }
            Err(err) => return Err(store_failure(tenant, "creating user")(err)),
        }

        let created = self.require_user(tenant, user.id).await?;
        tracing::info!(%tenant, user_id = %created.id, email = %created.email, "User created");
        Ok(created.into())
    }

    pub async fn get_user(&self, tenant: &TenantId, id: Uuid) -> UserResult<UserResponse> {
        Ok(self.require_user(tenant, id).await?.into())
    }

    pub async fn get_user_by_email(&self, tenant: &TenantId, email: &str) -> UserResult<UserResponse> {
        let email = normalize_email(email);
        let user = self
            .repository
            .get_by_email(tenant, &email)
            .await
            .map_err(store_failure(tenant, "fetching user by email"))?;

        match user {
            Some(user) => Ok(user.into()),
            None => {
                tracing::warn!(%tenant, %email, "User not found");
                Err(UserError::NotFound)
            }
        }
    }

    /// Administrative update of names, status and roles.
    pub async fn update_user(
        &self,
        tenant: &TenantId,
        id: Uuid,
        input: UpdateUser,
    ) -> UserResult<UserResponse> {
        self.apply_changes(tenant, id, input.into()).await
    }

    /// Self-service update; only names can change.
    pub async fn update_profile(
        &self,
        tenant: &TenantId,
        user_id: Uuid,
        input: UpdateProfile,
    ) -> UserResult<UserResponse> {
        self.apply_changes(tenant, user_id, input.into()).await
    }

    pub async fn delete_user(&self, tenant: &TenantId, id: Uuid) -> UserResult<()> {
        let user = self.require_user(tenant, id).await?;

        self.repository
            .delete(tenant, id)
            .await
            .map_err(store_failure(tenant, "deleting user"))?;

        tracing::info!(%tenant, user_id = %id, email = %user.email, "User deleted");
        Ok(())
    }

    pub async fn list_users(&self, tenant: &TenantId, query: UserQuery) -> UserResult<UserListResponse> {
        let query = query.normalized();

        let (users, total) = self
            .repository
            .list(tenant, &query)
            .await
            .map_err(store_failure(tenant, "listing users"))?;

        Ok(UserListResponse {
            users: users.into_iter().map(UserResponse::from).collect(),
            total,
            page: query.page,
            limit: query.limit,
            total_pages: total_pages(total, query.limit),
        })
    }

    pub async fn ping(&self) -> UserResult<()> {
        self.repository.ping().await.map_err(|err| {
            tracing::error!(error = %err, "Store ping failed");
            UserError::Store(err)
        })
    }

    /// Existence check, then the sparse write. An empty change set returns the
    /// current record without touching the store, so `updated_at` is kept.
    async fn apply_changes(
        &self,
        tenant: &TenantId,
        id: Uuid,
        changes: UserChanges,
    ) -> UserResult<UserResponse> {
        let current = self.require_user(tenant, id).await?;

        if changes.is_empty() {
            tracing::debug!(%tenant, user_id = %id, "No changes to apply");
            return Ok(current.into());
        }

        self.repository
            .update(tenant, id, &changes)
            .await
            .map_err(store_failure(tenant, "updating user"))?;

        let updated = self.require_user(tenant, id).await?;
        tracing::info!(%tenant, user_id = %id, email = %updated.email, "User updated");
        Ok(updated.into())
    }

    async fn require_user(&self, tenant: &TenantId, id: Uuid) -> UserResult<User> {
        let user = self
            .repository
            .get_by_id(tenant, id)
            .await
            .map_err(store_failure(tenant, "fetching user"))?;

        user.ok_or_else(|| {
            tracing::warn!(%tenant, user_id = %id, "User not found");
            UserError::NotFound
        })
    }

    async fn hash_password(&self, tenant: &TenantId, password: String) -> UserResult<String> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| e.to_string())
            .and_then(|hashed| hashed)
            .map_err(|e| {
                tracing::error!(%tenant, error = %e, "Error hashing password");
                UserError::PasswordHash(e)
            })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn store_failure<'a>(tenant: &'a TenantId, action: &'static str) -> impl FnOnce(StoreError) -> UserError + 'a {
    move |err| {
        tracing::error!(%tenant, error = %err, "Error {action}");
        UserError::Store(err)
    }
}
