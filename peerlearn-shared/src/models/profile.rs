/// Profile model and database operations
///
/// A profile is the account record: credentials, display fields, the
/// university it belongs to and the points balance used to pay for
/// subscriptions. Roles live in `user_roles` (see [`crate::models::role`]).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE profiles (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL UNIQUE CHECK (email = LOWER(email)),
///     password_hash VARCHAR(255) NOT NULL,
///     full_name VARCHAR(255) NOT NULL,
///     bio TEXT,
///     avatar_url VARCHAR(512),
///     university_id UUID REFERENCES universities(id) ON DELETE SET NULL,
///     points INTEGER NOT NULL DEFAULT 0 CHECK (points >= 0),
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use peerlearn_shared::models::profile::{CreateProfile, Profile};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let profile = Profile::create(&pool, CreateProfile {
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     full_name: "Ada Lovelace".to_string(),
///     points: 50,
/// }).await?;
///
/// let found = Profile::find_by_email(&pool, "ADA@example.com").await?;
/// assert_eq!(found.map(|p| p.id), Some(profile.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// Lowercases and trims an email address
///
/// Emails are stored normalized so the unique constraint is case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Profile row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    /// Unique profile ID
    pub id: Uuid,

    /// Normalized (lowercase) email address
    pub email: String,

    /// Argon2id PHC string
    ///
    /// Never serialized into API responses.
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub full_name: String,

    pub bio: Option<String>,

    pub avatar_url: Option<String>,

    pub university_id: Option<Uuid>,

    /// Points balance, never negative
    pub points: i32,

    /// Deactivated profiles cannot log in
    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// When the profile last logged in (None if never)
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Public view of a profile, without email or balance
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PublicProfile {
    pub id: Uuid,
    pub full_name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub university_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<Profile> for PublicProfile {
    fn from(p: Profile) -> Self {
        Self {
            id: p.id,
            full_name: p.full_name,
            bio: p.bio,
            avatar_url: p.avatar_url,
            university_id: p.university_id,
            created_at: p.created_at,
        }
    }
}

/// Input for creating a profile
#[derive(Debug, Clone)]
pub struct CreateProfile {
    /// Email address, normalized on insert
    pub email: String,

    /// Argon2id hash (NOT the plaintext password)
    pub password_hash: String,

    pub full_name: String,

    /// Opening balance (the signup bonus)
    pub points: i32,
}

/// Input for updating a profile
///
/// Only `Some` fields are written. Nested options clear the column with
/// `Some(None)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfile {
    pub full_name: Option<String>,
    pub bio: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
    pub university_id: Option<Option<Uuid>>,
}

impl UpdateProfile {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.bio.is_none()
            && self.avatar_url.is_none()
            && self.university_id.is_none()
    }
}

const PROFILE_COLUMNS: &str = "id, email, password_hash, full_name, bio, avatar_url, \
     university_id, points, is_active, created_at, updated_at, last_login_at";

impl Profile {
    /// Creates a new profile
    ///
    /// # Errors
    ///
    /// Returns an error if the email already exists (unique violation on
    /// `profiles_email_key`) or the database is unreachable.
    pub async fn create(
        executor: impl PgExecutor<'_>,
        data: CreateProfile,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO profiles (email, password_hash, full_name, points) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            PROFILE_COLUMNS
        );

        sqlx::query_as::<_, Profile>(&sql)
            .bind(normalize_email(&data.email))
            .bind(data.password_hash)
            .bind(data.full_name)
            .bind(data.points)
            .fetch_one(executor)
            .await
    }

    /// Finds a profile by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM profiles WHERE id = $1", PROFILE_COLUMNS);

        sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a profile by email, case-insensitively
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM profiles WHERE email = $1", PROFILE_COLUMNS);

        sqlx::query_as::<_, Profile>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(pool)
            .await
    }

    /// Applies a partial update
    ///
    /// Returns `None` if the profile does not exist. An empty update returns
    /// the current row unchanged.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProfile,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() {
            return Self::find_by_id(pool, id).await;
        }

        // COALESCE cannot distinguish "leave alone" from "clear", so each
        // nullable column carries a flag saying whether it is being set.
        let sql = format!(
            r#"
            UPDATE profiles SET
                full_name = COALESCE($2, full_name),
                bio = CASE WHEN $3 THEN $4 ELSE bio END,
                avatar_url = CASE WHEN $5 THEN $6 ELSE avatar_url END,
                university_id = CASE WHEN $7 THEN $8 ELSE university_id END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        );

        sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .bind(data.full_name)
            .bind(data.bio.is_some())
            .bind(data.bio.flatten())
            .bind(data.avatar_url.is_some())
            .bind(data.avatar_url.flatten())
            .bind(data.university_id.is_some())
            .bind(data.university_id.flatten())
            .fetch_optional(pool)
            .await
    }

    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE profiles SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Activates or deactivates a profile; returns false if it does not exist
    pub async fn set_active(pool: &PgPool, id: Uuid, active: bool) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE profiles SET is_active = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(active)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// `is_active` of a profile, or `None` if it does not exist
    pub async fn active_flag(pool: &PgPool, id: Uuid) -> Result<Option<bool>, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT is_active FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Current points balance
    pub async fn points(pool: &PgPool, id: Uuid) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, i32>("SELECT points FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Locks the profile row for the rest of the transaction and returns its balance
    ///
    /// Ledger operations call this first so that concurrent payments or
    /// withdrawals by the same profile serialize on the row lock.
    pub async fn lock_for_update(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, i32>("SELECT points FROM profiles WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Adds `delta` (possibly negative) to the balance and returns the new one
    ///
    /// The `points >= 0` CHECK rejects an overdraft with a constraint error.
    pub async fn adjust_points(
        executor: impl PgExecutor<'_>,
        id: Uuid,
        delta: i32,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE profiles SET points = points + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING points
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_one(executor)
        .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM profiles")
            .fetch_one(pool)
            .await
    }

    pub fn public(self) -> PublicProfile {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            full_name: "Ada".to_string(),
            bio: None,
            avatar_url: None,
            university_id: None,
            points: 50,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["points"], 50);
    }

    #[test]
    fn test_public_profile_hides_email() {
        let json = serde_json::to_value(sample().public()).unwrap();
        assert!(json.get("email").is_none());
        assert!(json.get("points").is_none());
        assert_eq!(json["full_name"], "Ada");
    }

    #[test]
    fn test_update_profile_is_empty() {
        assert!(UpdateProfile::default().is_empty());
        let update = UpdateProfile {
            bio: Some(None),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
