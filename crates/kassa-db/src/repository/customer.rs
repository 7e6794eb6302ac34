//! # Customer Repository

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use kassa_core::Customer;

#[derive(Debug, Clone, sqlx::FromRow)]
struct CustomerRecord {
    id: String,
    name: String,
    email: Option<String>,
    phone: Option<String>,
}

impl From<CustomerRecord> for Customer {
    fn from(record: CustomerRecord) -> Self {
        Customer {
            id: record.id,
            name: record.name,
            email: record.email,
            phone: record.phone,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        debug!(customer_id = %id, "Loading customer");

        let record: Option<CustomerRecord> =
            sqlx::query_as("SELECT id, name, email, phone FROM customers WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(record.map(Customer::from))
    }

    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(customer_id = %customer.id, "Inserting customer");

        sqlx::query(
            "INSERT INTO customers (id, name, email, phone, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
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
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = Customer {
            id: "c1".to_string(),
            name: "Ada".to_string(),
            email: Some("ada@example.com".to_string()),
            phone: None,
        };
        db.customers().insert(&customer).await.unwrap();

        assert_eq!(db.customers().get_by_id("c1").await.unwrap(), Some(customer));
        assert_eq!(db.customers().get_by_id("c2").await.unwrap(), None);
    }
}
