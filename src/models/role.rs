use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A role as read from the `roles` table. Roles are managed elsewhere; this
/// service only links users to them.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub permissions: serde_json::Value,
}
