/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, token refresh
/// - `profiles`, `universities`
/// - `subjects`, `subscriptions`, `posts`
/// - `sessions`, `enrollments`, `reviews`
/// - `notes`, `todos`, `quizzes`
/// - `chat`, `notifications`, `realtime`
/// - `applications`, `wallet`, `settings`, `admin`
/// - `storage`, `functions`

pub mod admin;
pub mod applications;
pub mod auth;
pub mod chat;
pub mod enrollments;
pub mod functions;
pub mod health;
pub mod notes;
pub mod notifications;
pub mod posts;
pub mod profiles;
pub mod quizzes;
pub mod realtime;
pub mod reviews;
pub mod sessions;
pub mod settings;
pub mod storage;
pub mod subjects;
pub mod subscriptions;
pub mod todos;
pub mod universities;
pub mod wallet;

use serde::{Deserialize, Deserializer};

/// `?limit=&offset=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 100;

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Distinguishes an absent field from an explicit `null`
///
/// Use with `#[serde(default, deserialize_with = "double_option")]` on an
/// `Option<Option<T>>`: absent → `None`, `null` → `Some(None)`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trims a string and turns blanks into `None`
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        bio: Option<Option<String>>,
    }

    #[test]
    fn test_pagination_clamps() {
        let p = Pagination::default();
        assert_eq!(p.limit(), Pagination::DEFAULT_LIMIT);
        assert_eq!(p.offset(), 0);

        let p = Pagination {
            limit: Some(10_000),
            offset: Some(-5),
        };
        assert_eq!(p.limit(), Pagination::MAX_LIMIT);
        assert_eq!(p.offset(), 0);

        let p = Pagination {
            limit: Some(0),
            offset: Some(20),
        };
        assert_eq!(p.limit(), 1);
        assert_eq!(p.offset(), 20);
    }

    #[test]
    fn test_double_option() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.bio, None);

        let null: Patch = serde_json::from_str(r#"{"bio": null}"#).unwrap();
        assert_eq!(null.bio, Some(None));

        let set: Patch = serde_json::from_str(r#"{"bio": "hi"}"#).unwrap();
        assert_eq!(set.bio, Some(Some("hi".to_string())));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  x ".into())), Some("x".to_string()));
        assert_eq!(non_blank(Some("   ".into())), None);
        assert_eq!(non_blank(None), None);
    }
}
