/// Platform settings stored as JSON values keyed by name
///
/// Every setting the code reads is a [`SettingKey`] with a built-in default,
/// so a missing or malformed row never breaks a request; it just falls back.
///
/// | Key | Default | Meaning |
/// |---|---|---|
/// | `commission_percent` | 20 | Platform cut of subscription payments |
/// | `quiz_pass_points` | 10 | Points for the first passing attempt of a quiz |
/// | `signup_bonus_points` | 50 | Opening balance of a new profile |
/// | `min_withdrawal` | 100 | Smallest withdrawal a teacher may request |
/// | `reminder_lead_minutes` | 30 | How long before a session its reminder fires |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{PgExecutor, PgPool};
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    CommissionPercent,
    QuizPassPoints,
    SignupBonusPoints,
    MinWithdrawal,
    ReminderLeadMinutes,
}

impl SettingKey {
    pub const ALL: [SettingKey; 5] = [
        SettingKey::CommissionPercent,
        SettingKey::QuizPassPoints,
        SettingKey::SignupBonusPoints,
        SettingKey::MinWithdrawal,
        SettingKey::ReminderLeadMinutes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::CommissionPercent => "commission_percent",
            SettingKey::QuizPassPoints => "quiz_pass_points",
            SettingKey::SignupBonusPoints => "signup_bonus_points",
            SettingKey::MinWithdrawal => "min_withdrawal",
            SettingKey::ReminderLeadMinutes => "reminder_lead_minutes",
        }
    }

    pub fn default_value(&self) -> i64 {
        match self {
            SettingKey::CommissionPercent => 20,
            SettingKey::QuizPassPoints => 10,
            SettingKey::SignupBonusPoints => 50,
            SettingKey::MinWithdrawal => 100,
            SettingKey::ReminderLeadMinutes => 30,
        }
    }

    /// Inclusive range an admin may set
    pub fn allowed_range(&self) -> (i64, i64) {
        match self {
            SettingKey::CommissionPercent => (0, 100),
            SettingKey::ReminderLeadMinutes => (0, 7 * 24 * 60),
            _ => (0, i64::from(i32::MAX)),
        }
    }

    /// Parses and range-checks a new value for this key
    pub fn validate(&self, value: &JsonValue) -> Result<i64, SettingError> {
        let n = value
            .as_i64()
            .ok_or(SettingError::NotAnInteger(self.as_str()))?;
        let (min, max) = self.allowed_range();
        if n < min || n > max {
            return Err(SettingError::OutOfRange {
                key: self.as_str(),
                min,
                max,
            });
        }
        Ok(n)
    }
}

impl FromStr for SettingKey {
    type Err = SettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SettingKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| SettingError::UnknownKey(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingError {
    #[error("Unknown setting: {0}")]
    UnknownKey(String),

    #[error("Setting {0} must be an integer")]
    NotAnInteger(&'static str),

    #[error("Setting {key} must be between {min} and {max}")]
    OutOfRange {
        key: &'static str,
        min: i64,
        max: i64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlatformSetting {
    pub key: String,
    pub value: JsonValue,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl PlatformSetting {
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PlatformSetting>(
            "SELECT key, value, updated_by, updated_at FROM platform_settings ORDER BY key",
        )
        .fetch_all(pool)
        .await
    }

    /// Reads an integer setting, falling back to its default
    pub async fn get_i64(executor: impl PgExecutor<'_>, key: SettingKey) -> Result<i64, sqlx::Error> {
        let value = sqlx::query_scalar::<_, JsonValue>(
            "SELECT value FROM platform_settings WHERE key = $1",
        )
        .bind(key.as_str())
        .fetch_optional(executor)
        .await?;

        Ok(match value {
            Some(v) => v.as_i64().unwrap_or_else(|| {
                warn!(key = key.as_str(), value = %v, "Non-integer setting, using default");
                key.default_value()
            }),
            None => key.default_value(),
        })
    }

    pub async fn upsert(
        pool: &PgPool,
        key: SettingKey,
        value: JsonValue,
        updated_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, PlatformSetting>(
            r#"
            INSERT INTO platform_settings (key, value, updated_by)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE
                SET value = EXCLUDED.value, updated_by = EXCLUDED.updated_by, updated_at = NOW()
            RETURNING key, value, updated_by, updated_at
            "#,
        )
        .bind(key.as_str())
        .bind(value)
        .bind(updated_by)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        assert_eq!(SettingKey::CommissionPercent.default_value(), 20);
        assert_eq!(SettingKey::QuizPassPoints.default_value(), 10);
        assert_eq!(SettingKey::SignupBonusPoints.default_value(), 50);
        assert_eq!(SettingKey::MinWithdrawal.default_value(), 100);
        assert_eq!(SettingKey::ReminderLeadMinutes.default_value(), 30);
    }

    #[test]
    fn test_parse_keys() {
        for key in SettingKey::ALL {
            assert_eq!(key.as_str().parse::<SettingKey>().unwrap(), key);
        }
        assert!(matches!(
            "nope".parse::<SettingKey>(),
            Err(SettingError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_validate_value() {
        assert_eq!(SettingKey::CommissionPercent.validate(&json!(15)), Ok(15));
        assert!(matches!(
            SettingKey::CommissionPercent.validate(&json!(101)),
            Err(SettingError::OutOfRange { .. })
        ));
        assert!(matches!(
            SettingKey::MinWithdrawal.validate(&json!(-1)),
            Err(SettingError::OutOfRange { .. })
        ));
        assert!(matches!(
            SettingKey::QuizPassPoints.validate(&json!("10")),
            Err(SettingError::NotAnInteger(_))
        ));
    }
}
