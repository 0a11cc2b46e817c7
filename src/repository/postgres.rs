use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{self, StoreResult};
use crate::models::{NewUser, Role, TenantId, User, UserChanges, UserQuery};

use super::UserRepository;

/// PostgreSQL-backed repository. Tenant scoping lives in every statement's
/// WHERE clause (see `db::users`).
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach_roles(&self, tenant: &TenantId, users: &mut [User]) -> StoreResult<()> {
        if users.is_empty() {
            return Ok(());
        }

        let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
        let rows = db::roles::for_users(&self.pool, tenant, &ids).await?;

        let mut by_user: HashMap<Uuid, Vec<Role>> = HashMap::new();
        for row in rows {
            by_user.entry(row.user_id).or_default().push(row.role);
        }
        for user in users.iter_mut() {
            user.roles = by_user.remove(&user.id).unwrap_or_default();
        }
        Ok(())
    }

    async fn with_roles(&self, tenant: &TenantId, user: Option<User>) -> StoreResult<Option<User>> {
        match user {
            Some(user) => {
                let mut users = [user];
                self.attach_roles(tenant, &mut users).await?;
                let [user] = users;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, tenant: &TenantId, user: &NewUser) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        db::users::insert(&mut *tx, tenant, user).await?;
        db::roles::assign(&mut *tx, tenant, user.id, &user.role_ids).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_by_id(&self, tenant: &TenantId, id: Uuid) -> StoreResult<Option<User>> {
        let user = db::users::find_by_id(&self.pool, tenant, id).await?;
        self.with_roles(tenant, user).await
    }

    async fn get_by_email(&self, tenant: &TenantId, email: &str) -> StoreResult<Option<User>> {
        let user = db::users::find_by_email(&self.pool, tenant, email).await?;
        self.with_roles(tenant, user).await
    }

    async fn update(&self, tenant: &TenantId, id: Uuid, changes: &UserChanges) -> StoreResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        let touched = db::users::update(&mut *tx, tenant, id, changes).await?;
        if touched > 0 {
            if let Some(role_ids) = &changes.role_ids {
                db::roles::clear_for_user(&mut *tx, id).await?;
                db::roles::assign(&mut *tx, tenant, id, role_ids).await?;
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, tenant: &TenantId, id: Uuid) -> StoreResult<()> {
        db::users::delete(&self.pool, tenant, id).await?;
        Ok(())
    }

    async fn list(&self, tenant: &TenantId, query: &UserQuery) -> StoreResult<(Vec<User>, i64)> {
        let total = db::users::count(&self.pool, tenant, query).await?;
        let mut users = db::users::list(&self.pool, tenant, query).await?;
        self.attach_roles(tenant, &mut users).await?;
        Ok((users, total))
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
