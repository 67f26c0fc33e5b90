/// Universities that profiles and subjects can be attached to

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct University {
    pub id: Uuid,
    pub name: String,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl University {
    /// Inserts a university; the name is unique (`universities_name_key`)
    pub async fn create(
        pool: &PgPool,
        name: &str,
        country: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, University>(
            r#"
            INSERT INTO universities (name, country)
            VALUES ($1, $2)
            RETURNING id, name, country, created_at
            "#,
        )
        .bind(name.trim())
        .bind(country)
        .fetch_one(pool)
        .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, University>(
            "SELECT id, name, country, created_at FROM universities ORDER BY name",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM universities WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }
}
