//! # Register Repository
//!
//! POS terminals and the branch each one is installed at.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// A POS terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Register {
    pub id: String,
    pub name: String,
    pub branch_id: String,
}

#[derive(Debug, Clone)]
pub struct RegisterRepository {
    pool: SqlitePool,
}

impl RegisterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RegisterRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Register>> {
        debug!(register_id = %id, "Loading register");

        let register: Option<Register> =
            sqlx::query_as("SELECT id, name, branch_id FROM registers WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(register)
    }

    /// Inserts or moves a register.
    pub async fn upsert(&self, register: &Register) -> DbResult<()> {
        debug!(register_id = %register.id, branch_id = %register.branch_id, "Saving register");

        sqlx::query(
            r#"
            INSERT INTO registers (id, name, branch_id, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name, branch_id = excluded.branch_id
            "#,
        )
        .bind(&register.id)
        .bind(&register.name)
        .bind(&register.branch_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_upsert_moves_register() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut register = Register {
            id: "R1".to_string(),
            name: "Front".to_string(),
            branch_id: "north".to_string(),
        };
        db.registers().upsert(&register).await.unwrap();

        register.branch_id = "south".to_string();
        db.registers().upsert(&register).await.unwrap();

        let loaded = db.registers().get_by_id("R1").await.unwrap().unwrap();
        assert_eq!(loaded.branch_id, "south");
        assert!(db.registers().get_by_id("R2").await.unwrap().is_none());
    }
}
