use uuid::Uuid;

use crate::models::{Role, TenantId};

#[derive(Debug, sqlx::FromRow)]
pub struct UserRoleRow {
    pub user_id: Uuid,
    #[sqlx(flatten)]
    pub role: Role,
}

/// Roles of every listed user in one round trip.
pub async fn for_users<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    tenant: &TenantId,
    user_ids: &[Uuid],
) -> Result<Vec<UserRoleRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRoleRow>(
        "SELECT ur.user_id, r.id, r.name, r.permissions
         FROM user_roles ur
         JOIN roles r ON r.id = ur.role_id
         WHERE r.tenant_id = $1 AND ur.user_id = ANY($2)
         ORDER BY r.name",
    )
    .bind(tenant.as_str())
    .bind(user_ids)
    .fetch_all(executor)
    .await
}

pub async fn clear_for_user<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Link a user to the given roles. IDs that do not name a role of the same
/// tenant are skipped.
pub async fn assign<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    tenant: &TenantId,
    user_id: Uuid,
    role_ids: &[Uuid],
) -> Result<u64, sqlx::Error> {
    if role_ids.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query(
        "INSERT INTO user_roles (user_id, role_id)
         SELECT $1, r.id FROM roles r WHERE r.tenant_id = $2 AND r.id = ANY($3)
         ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(tenant.as_str())
    .bind(role_ids)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
