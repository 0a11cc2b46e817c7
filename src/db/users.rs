use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{NewUser, TenantId, User, UserChanges, UserQuery};

pub async fn insert<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    tenant: &TenantId,
    user: &NewUser,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (id, tenant_id, email, first_name, last_name, password_hash, status)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(user.id)
    .bind(tenant.as_str())
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(user.status.as_str())
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_by_id<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    tenant: &TenantId,
    id: Uuid,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE tenant_id = $1 AND id = $2")
        .bind(tenant.as_str())
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn find_by_email<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    tenant: &TenantId,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE tenant_id = $1 AND email = $2")
        .bind(tenant.as_str())
        .bind(email)
        .fetch_optional(executor)
        .await
}

/// Write the column part of a change set. `updated_at` is always bumped, so
/// callers must not pass an empty set.
pub async fn update<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    tenant: &TenantId,
    id: Uuid,
    changes: &UserChanges,
) -> Result<u64, sqlx::Error> {
    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("UPDATE users SET ");
    {
        let mut set = qb.separated(", ");
        if let Some(first_name) = &changes.first_name {
            set.push("first_name = ");
            set.push_bind_unseparated(first_name.clone());
        }
        if let Some(last_name) = &changes.last_name {
            set.push("last_name = ");
            set.push_bind_unseparated(last_name.clone());
        }
        if let Some(status) = changes.status {
            set.push("status = ");
            set.push_bind_unseparated(status.as_str());
        }
        set.push("updated_at = now()");
    }
    qb.push(" WHERE tenant_id = ")
        .push_bind(tenant.as_str().to_owned())
        .push(" AND id = ")
        .push_bind(id);

    let result = qb.build().execute(executor).await?;
    Ok(result.rows_affected())
}

pub async fn delete<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    tenant: &TenantId,
    id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE tenant_id = $1 AND id = $2")
        .bind(tenant.as_str())
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn list<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    tenant: &TenantId,
    query: &UserQuery,
) -> Result<Vec<User>, sqlx::Error> {
    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT users.* FROM users");
    push_filters(&mut qb, tenant, query);

    qb.push(" ORDER BY ").push(query.sort.order_by());

    if let Some((limit, offset)) = query.window() {
        qb.push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
    }

    qb.build_query_as::<User>().fetch_all(executor).await
}

/// Number of users matching the filters of `query`, ignoring its paging.
pub async fn count<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    tenant: &TenantId,
    query: &UserQuery,
) -> Result<i64, sqlx::Error> {
    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM users");
    push_filters(&mut qb, tenant, query);
    qb.build_query_scalar::<i64>().fetch_one(executor).await
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, tenant: &TenantId, query: &UserQuery) {
    qb.push(" WHERE users.tenant_id = ")
        .push_bind(tenant.as_str().to_owned());

    if let Some(status) = query.status {
        qb.push(" AND users.status = ").push_bind(status.as_str());
    }

    if let Some(term) = query.search_term() {
        let pattern = like_pattern(term);
        qb.push(" AND (users.first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR users.last_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR users.email ILIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }

    if !query.role_ids.is_empty() {
        qb.push(
            " AND EXISTS (SELECT 1 FROM user_roles ur WHERE ur.user_id = users.id AND ur.role_id = ANY(",
        )
        .push_bind(query.role_ids.clone())
        .push("))");
    }
}

/// `%term%` with LIKE metacharacters escaped, so the term matches literally.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
