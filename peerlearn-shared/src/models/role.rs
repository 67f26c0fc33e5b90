/// Application roles and the `user_roles` table
///
/// # Schema
///
/// ```sql
/// CREATE TYPE app_role AS ENUM ('student', 'teacher', 'admin');
///
/// CREATE TABLE user_roles (
///     user_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
///     role app_role NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (user_id, role)
/// );
/// ```
///
/// A profile holds any subset of roles. Registration grants `student`;
/// an approved teacher application (or the admin add-teacher endpoint)
/// grants `teacher`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use std::fmt;
use uuid::Uuid;

/// Platform role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "app_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AppRole {
    /// Browses subjects, enrolls, takes quizzes
    Student,

    /// Creates subjects, sessions and quizzes; earns points
    Teacher,

    /// Moderates applications, subjects, withdrawals and settings
    Admin,
}

impl AppRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppRole::Student => "student",
            AppRole::Teacher => "teacher",
            AppRole::Admin => "admin",
        }
    }
}

impl fmt::Display for AppRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of `user_roles`
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRole {
    pub user_id: Uuid,
    pub role: AppRole,
    pub created_at: DateTime<Utc>,
}

impl UserRole {
    /// Grants a role; returns false when the user already had it
    pub async fn grant(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
        role: AppRole,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role)
            VALUES ($1, $2)
            ON CONFLICT (user_id, role) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(role)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Revokes a role; returns false when the user did not have it
    pub async fn revoke(pool: &PgPool, user_id: Uuid, role: AppRole) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role = $2")
            .bind(user_id)
            .bind(role)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists the roles of a user, in enum order
    pub async fn roles_for(pool: &PgPool, user_id: Uuid) -> Result<Vec<AppRole>, sqlx::Error> {
        sqlx::query_scalar::<_, AppRole>(
            "SELECT role FROM user_roles WHERE user_id = $1 ORDER BY role",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn has_role(pool: &PgPool, user_id: Uuid, role: AppRole) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM user_roles WHERE user_id = $1 AND role = $2)",
        )
        .bind(user_id)
        .bind(role)
        .fetch_one(pool)
        .await
    }

    /// Number of profiles holding each role
    pub async fn count_by_role(pool: &PgPool) -> Result<Vec<(AppRole, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (AppRole, i64)>(
            "SELECT role, COUNT(*) FROM user_roles GROUP BY role ORDER BY role",
        )
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&AppRole::Teacher).unwrap(), "\"teacher\"");
        let role: AppRole = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, AppRole::Admin);
        assert_eq!(AppRole::Student.to_string(), "student");
    }
}
