use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::{StoreError, StoreResult, USERS_EMAIL_CONSTRAINT};
use crate::models::{
    NewUser, Role, SortDirection, SortField, TenantId, User, UserChanges, UserQuery,
};

use super::UserRepository;

#[derive(Debug, Default)]
struct TenantData {
    users: HashMap<Uuid, User>,
    memberships: HashMap<Uuid, Vec<Uuid>>,
    roles: HashMap<Uuid, Role>,
}

impl TenantData {
    fn hydrate(&self, user: &User) -> User {
        let mut user = user.clone();
        let mut roles: Vec<Role> = self
            .memberships
            .get(&user.id)
            .into_iter()
            .flatten()
            .filter_map(|role_id| self.roles.get(role_id).cloned())
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        user.roles = roles;
        user
    }

    fn known_roles(&self, role_ids: &[Uuid]) -> Vec<Uuid> {
        let mut known: Vec<Uuid> = role_ids
            .iter()
            .copied()
            .filter(|id| self.roles.contains_key(id))
            .collect();
        known.sort();
        known.dedup();
        known
    }

    fn matches(&self, user: &User, query: &UserQuery) -> bool {
        if let Some(status) = query.status {
            if user.status != status {
                return false;
            }
        }
        if let Some(term) = query.search_term() {
            let term = term.to_lowercase();
            let hit = [&user.first_name, &user.last_name, &user.email]
                .iter()
                .any(|field| field.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        if !query.role_ids.is_empty() {
            let linked = self.memberships.get(&user.id);
            let hit = linked.is_some_and(|ids| ids.iter().any(|id| query.role_ids.contains(id)));
            if !hit {
                return false;
            }
        }
        true
    }
}

/// In-memory repository for tests and local development. Data is partitioned
/// by tenant, so isolation holds by construction.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    tenants: Arc<RwLock<HashMap<TenantId, TenantData>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a role for a tenant. Roles are owned elsewhere; this is how
    /// tests and local setups provide them.
    pub async fn seed_role(&self, tenant: &TenantId, role: Role) {
        let mut tenants = self.tenants.write().await;
        tenants
            .entry(tenant.clone())
            .or_default()
            .roles
            .insert(role.id, role);
    }

    /// Raw stored record, password hash included.
    pub async fn stored(&self, tenant: &TenantId, id: Uuid) -> Option<User> {
        let tenants = self.tenants.read().await;
        tenants.get(tenant)?.users.get(&id).cloned()
    }
}

fn compare(a: &User, b: &User, query: &UserQuery) -> Ordering {
    let by_field = match query.sort.field {
        SortField::Email => a.email.cmp(&b.email),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::FirstName => a.first_name.cmp(&b.first_name),
        SortField::LastName => a.last_name.cmp(&b.last_name),
    };
    let ordering = by_field.then_with(|| a.id.cmp(&b.id));
    match query.sort.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, tenant: &TenantId, user: &NewUser) -> StoreResult<()> {
        let mut tenants = self.tenants.write().await;
        let data = tenants.entry(tenant.clone()).or_default();

        if data.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation(USERS_EMAIL_CONSTRAINT.to_string()));
        }

        let now = Utc::now();
        data.users.insert(
            user.id,
            User {
                id: user.id,
                tenant_id: tenant.clone(),
                email: user.email.clone(),
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                password_hash: user.password_hash.clone(),
                status: user.status,
                roles: Vec::new(),
                created_at: now,
                updated_at: now,
            },
        );
        let role_ids = data.known_roles(&user.role_ids);
        data.memberships.insert(user.id, role_ids);
        Ok(())
    }

    async fn get_by_id(&self, tenant: &TenantId, id: Uuid) -> StoreResult<Option<User>> {
        let tenants = self.tenants.read().await;
        Ok(tenants
            .get(tenant)
            .and_then(|data| data.users.get(&id).map(|u| data.hydrate(u))))
    }

    async fn get_by_email(&self, tenant: &TenantId, email: &str) -> StoreResult<Option<User>> {
        let tenants = self.tenants.read().await;
        Ok(tenants.get(tenant).and_then(|data| {
            data.users
                .values()
                .find(|u| u.email == email)
                .map(|u| data.hydrate(u))
        }))
    }

    async fn update(&self, tenant: &TenantId, id: Uuid, changes: &UserChanges) -> StoreResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut tenants = self.tenants.write().await;
        let Some(data) = tenants.get_mut(tenant) else {
            return Ok(());
        };
        let role_ids = changes.role_ids.as_deref().map(|ids| data.known_roles(ids));
        let Some(user) = data.users.get_mut(&id) else {
            return Ok(());
        };

        if let Some(first_name) = &changes.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &changes.last_name {
            user.last_name = last_name.clone();
        }
        if let Some(status) = changes.status {
            user.status = status;
        }
        user.updated_at = Utc::now();

        if let Some(role_ids) = role_ids {
            data.memberships.insert(id, role_ids);
        }
        Ok(())
    }

    async fn delete(&self, tenant: &TenantId, id: Uuid) -> StoreResult<()> {
        let mut tenants = self.tenants.write().await;
        if let Some(data) = tenants.get_mut(tenant) {
            data.users.remove(&id);
            data.memberships.remove(&id);
        }
        Ok(())
    }

    async fn list(&self, tenant: &TenantId, query: &UserQuery) -> StoreResult<(Vec<User>, i64)> {
        let tenants = self.tenants.read().await;
        let Some(data) = tenants.get(tenant) else {
            return Ok((Vec::new(), 0));
        };

        let mut matched: Vec<&User> = data
            .users
            .values()
            .filter(|u| data.matches(u, query))
            .collect();
        let total = matched.len() as i64;

        matched.sort_by(|a, b| compare(a, b, query));

        let page: Vec<User> = match query.window() {
            Some((limit, offset)) => matched
                .into_iter()
                .skip(usize::try_from(offset).unwrap_or(usize::MAX))
                .take(limit as usize)
                .map(|u| data.hydrate(u))
                .collect(),
            None => matched.into_iter().map(|u| data.hydrate(u)).collect(),
        };

        Ok((page, total))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{UserSort, UserStatus};

    fn new_user(email: &str, first: &str, last: &str, status: UserStatus) -> NewUser {
        NewUser {
            id: Uuid::now_v7(),
            email: email.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            password_hash: "hash".to_string(),
            status,
            role_ids: vec![],
        }
    }

    fn role(name: &str) -> Role {
        Role {
            id: Uuid::now_v7(),
            name: name.to_string(),
            permissions: serde_json::json!({ "users": ["read"] }),
        }
    }

    #[tokio::test]
    async fn same_email_in_two_tenants_is_allowed() {
        let repo = InMemoryUserRepository::new();
        let (t1, t2) = (TenantId::new("t1"), TenantId::new("t2"));

        repo.create(&t1, &new_user("a@x.io", "Ann", "One", UserStatus::Active))
            .await
            .unwrap();
        repo.create(&t2, &new_user("a@x.io", "Ann", "Two", UserStatus::Active))
            .await
            .unwrap();

        let again = repo
            .create(&t1, &new_user("a@x.io", "Ann", "Three", UserStatus::Active))
            .await;
        assert!(matches!(again, Err(ref e) if e.is_unique_violation_of(USERS_EMAIL_CONSTRAINT)));
    }

    #[tokio::test]
    async fn lookups_never_cross_tenants() {
        let repo = InMemoryUserRepository::new();
        let (t1, t2) = (TenantId::new("t1"), TenantId::new("t2"));
        let user = new_user("a@x.io", "Ann", "One", UserStatus::Active);
        repo.create(&t1, &user).await.unwrap();

        assert!(repo.get_by_id(&t1, user.id).await.unwrap().is_some());
        assert!(repo.get_by_id(&t2, user.id).await.unwrap().is_none());
        assert!(repo.get_by_email(&t2, "a@x.io").await.unwrap().is_none());

        repo.delete(&t2, user.id).await.unwrap();
        assert!(repo.get_by_id(&t1, user.id).await.unwrap().is_some());

        let (users, total) = repo.list(&t2, &UserQuery::default()).await.unwrap();
        assert!(users.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn sparse_update_leaves_absent_fields() {
        let repo = InMemoryUserRepository::new();
        let tenant = TenantId::default();
        let user = new_user("a@x.io", "Ann", "One", UserStatus::Pending);
        repo.create(&tenant, &user).await.unwrap();

        let changes = UserChanges {
            last_name: Some("Changed".to_string()),
            ..Default::default()
        };
        repo.update(&tenant, user.id, &changes).await.unwrap();

        let stored = repo.get_by_id(&tenant, user.id).await.unwrap().unwrap();
        assert_eq!(stored.first_name, "Ann");
        assert_eq!(stored.last_name, "Changed");
        assert_eq!(stored.status, UserStatus::Pending);
        assert!(stored.updated_at >= stored.created_at);
    }

    #[tokio::test]
    async fn filters_combine_with_and() {
        let repo = InMemoryUserRepository::new();
        let tenant = TenantId::default();
        for (email, first, status) in [
            ("test1@x.io", "Alice", UserStatus::Active),
            ("bob@x.io", "TestBob", UserStatus::Active),
            ("test2@x.io", "Carol", UserStatus::Inactive),
            ("dave@x.io", "Dave", UserStatus::Active),
        ] {
            repo.create(&tenant, &new_user(email, first, "Smith", status))
                .await
                .unwrap();
        }

        let query = UserQuery {
            status: Some(UserStatus::Active),
            search: Some("TEST".to_string()),
            ..Default::default()
        };
        let (users, total) = repo.list(&tenant, &query).await.unwrap();

        assert_eq!(total, 2);
        let mut emails: Vec<_> = users.iter().map(|u| u.email.as_str()).collect();
        emails.sort();
        assert_eq!(emails, ["bob@x.io", "test1@x.io"]);
    }

    #[tokio::test]
    async fn role_filter_matches_membership_once() {
        let repo = InMemoryUserRepository::new();
        let tenant = TenantId::default();
        let (admin, editor) = (role("admin"), role("editor"));
        repo.seed_role(&tenant, admin.clone()).await;
        repo.seed_role(&tenant, editor.clone()).await;

        let mut both = new_user("both@x.io", "Both", "Roles", UserStatus::Active);
        both.role_ids = vec![admin.id, editor.id, Uuid::now_v7()];
        repo.create(&tenant, &both).await.unwrap();
        repo.create(&tenant, &new_user("none@x.io", "No", "Roles", UserStatus::Active))
            .await
            .unwrap();

        let query = UserQuery {
            role_ids: vec![admin.id, editor.id],
            ..Default::default()
        };
        let (users, total) = repo.list(&tenant, &query).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(users[0].email, "both@x.io");
        let names: Vec<_> = users[0].roles.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["admin", "editor"]);
    }

    #[tokio::test]
    async fn sorting_and_paging() {
        let repo = InMemoryUserRepository::new();
        let tenant = TenantId::default();
        for email in ["b@x.io", "d@x.io", "a@x.io", "c@x.io", "e@x.io"] {
            repo.create(&tenant, &new_user(email, "Name", "Last", UserStatus::Active))
                .await
                .unwrap();
        }

        let query = UserQuery {
            page: 2,
            limit: 2,
            sort: UserSort::parse("email:desc"),
            ..Default::default()
        };
        let (users, total) = repo.list(&tenant, &query).await.unwrap();
        assert_eq!(total, 5);
        let emails: Vec<_> = users.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, ["c@x.io", "b@x.io"]);

        let unpaged = UserQuery {
            sort: UserSort::parse("email:asc"),
            ..Default::default()
        };
        let (users, _) = repo.list(&tenant, &unpaged).await.unwrap();
        assert_eq!(users.len(), 5);
        assert_eq!(users[0].email, "a@x.io");

        let far = UserQuery {
            page: i64::MAX,
            limit: 20,
            ..Default::default()
        };
        let (users, total) = repo.list(&tenant, &far).await.unwrap();
        assert!(users.is_empty());
        assert_eq!(total, 5);
    }

    #[tokio::test]
    async fn update_with_roles_replaces_membership() {
        let repo = InMemoryUserRepository::new();
        let tenant = TenantId::default();
        let (admin, editor) = (role("admin"), role("editor"));
        repo.seed_role(&tenant, admin.clone()).await;
        repo.seed_role(&tenant, editor.clone()).await;

        let mut user = new_user("a@x.io", "Ann", "One", UserStatus::Active);
        user.role_ids = vec![admin.id];
        repo.create(&tenant, &user).await.unwrap();

        let changes = UserChanges {
            role_ids: Some(vec![editor.id]),
            ..Default::default()
        };
        repo.update(&tenant, user.id, &changes).await.unwrap();

        let stored = repo.get_by_id(&tenant, user.id).await.unwrap().unwrap();
        assert_eq!(stored.roles, vec![editor]);
    }
}
