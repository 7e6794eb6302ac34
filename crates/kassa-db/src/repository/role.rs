//! # Role Repository
//!
//! Custom roles only; built-in roles are compiled into kassa-core and never
//! stored. Permissions are a JSON array of permission names.

use std::collections::BTreeSet;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use kassa_core::{Permission, Role};

#[derive(Debug, Clone, sqlx::FromRow)]
struct RoleRecord {
    name: String,
    permissions: String,
}

impl RoleRecord {
    fn into_role(self) -> DbResult<Role> {
        let permissions: BTreeSet<Permission> = serde_json::from_str(&self.permissions)
            .map_err(|e| DbError::corrupt("role", &self.name, e))?;

        Ok(Role {
            name: self.name,
            permissions,
            builtin: false,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RoleRepository {
    pool: SqlitePool,
}

impl RoleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RoleRepository { pool }
    }

    pub async fn get(&self, name: &str) -> DbResult<Option<Role>> {
        debug!(role = %name, "Loading role");

        let record: Option<RoleRecord> =
            sqlx::query_as("SELECT name, permissions FROM roles WHERE name = ?1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        record.map(RoleRecord::into_role).transpose()
    }

    pub async fn list(&self) -> DbResult<Vec<Role>> {
        let records: Vec<RoleRecord> =
            sqlx::query_as("SELECT name, permissions FROM roles ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        records.into_iter().map(RoleRecord::into_role).collect()
    }

    /// Inserts or replaces a role's permissions.
    pub async fn upsert(&self, role: &Role) -> DbResult<()> {
        debug!(role = %role.name, permissions = role.permissions.len(), "Saving role");

        let permissions =
            serde_json::to_string(&role.permissions).map_err(|e| DbError::Internal(e.to_string()))?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO roles (name, permissions, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT(name) DO UPDATE SET
                permissions = excluded.permissions,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&role.name)
        .bind(permissions)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns whether a row was deleted.
    pub async fn delete(&self, name: &str) -> DbResult<bool> {
        debug!(role = %name, "Deleting role");

        let deleted = sqlx::query("DELETE FROM roles WHERE name = ?1")
            .bind(name)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_role_lifecycle() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let role = Role::custom("shift-lead", [Permission::ManageCart, Permission::ManageDiscounts]);

        db.roles().upsert(&role).await.unwrap();
        assert_eq!(db.roles().get("shift-lead").await.unwrap(), Some(role.clone()));

        let narrowed = Role::custom("shift-lead", [Permission::ManageCart]);
        db.roles().upsert(&narrowed).await.unwrap();
        assert_eq!(db.roles().list().await.unwrap(), vec![narrowed]);

        assert!(db.roles().delete("shift-lead").await.unwrap());
        assert!(!db.roles().delete("shift-lead").await.unwrap());
        assert!(db.roles().get("shift-lead").await.unwrap().is_none());
    }
}
