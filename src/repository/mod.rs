mod memory;
mod postgres;

pub use memory::InMemoryUserRepository;
pub use postgres::PgUserRepository;

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::StoreResult;
use crate::models::{NewUser, TenantId, User, UserChanges, UserQuery};

/// Tenant-scoped persistence for users.
///
/// Every method takes the tenant explicitly and never sees rows of another
/// tenant. Lookups return `Ok(None)` when nothing matches; errors are
/// reserved for store failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user and link its roles.
    async fn create(&self, tenant: &TenantId, user: &NewUser) -> StoreResult<()>;

    /// Point lookup by ID, roles included.
    async fn get_by_id(&self, tenant: &TenantId, id: Uuid) -> StoreResult<Option<User>>;

    /// Point lookup by (normalized) email, roles included.
    async fn get_by_email(&self, tenant: &TenantId, email: &str) -> StoreResult<Option<User>>;

    /// Apply a sparse change set. Does not check that the user exists.
    async fn update(&self, tenant: &TenantId, id: Uuid, changes: &UserChanges) -> StoreResult<()>;

    /// Hard delete.
    async fn delete(&self, tenant: &TenantId, id: Uuid) -> StoreResult<()>;

    /// Filtered, sorted page of users plus the filtered total.
    async fn list(&self, tenant: &TenantId, query: &UserQuery) -> StoreResult<(Vec<User>, i64)>;

    /// Check the store is reachable.
    async fn ping(&self) -> StoreResult<()>;
}
