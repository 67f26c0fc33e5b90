/// Platform settings endpoints (admin)
///
/// - `GET /v1/settings` - Every known key with its effective value
/// - `PUT /v1/settings/:key` - Set one key; body `{ "value": <integer> }`

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use peerlearn_shared::{
    auth::{authorization::require_current_role, middleware::AuthContext},
    models::{
        role::AppRole,
        setting::{PlatformSetting, SettingKey},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct UpdateSettingRequest {
    pub value: JsonValue,
}

/// Effective value of one setting
#[derive(Debug, Clone, Serialize)]
pub struct SettingView {
    pub key: SettingKey,
    pub value: i64,
    /// True when no row is stored and the built-in default applies
    pub is_default: bool,
    pub updated_by: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Merges stored rows over the built-in defaults, in key order
fn effective_settings(stored: &[PlatformSetting]) -> Vec<SettingView> {
    SettingKey::ALL
        .into_iter()
        .map(|key| {
            let row = stored.iter().find(|s| s.key == key.as_str());
            let value = row.and_then(|s| s.value.as_i64());
            SettingView {
                key,
                value: value.unwrap_or_else(|| key.default_value()),
                is_default: value.is_none(),
                updated_by: row.and_then(|s| s.updated_by),
                updated_at: row.map(|s| s.updated_at),
            }
        })
        .collect()
}

pub async fn list_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<SettingView>>> {
    require_current_role(&state.db, auth.user_id, AppRole::Admin).await?;
    let stored = PlatformSetting::list(&state.db).await?;
    Ok(Json(effective_settings(&stored)))
}

/// Set a setting
///
/// # Errors
///
/// - `404 Not Found`: Unknown key
/// - `422 Unprocessable Entity`: Not an integer, or out of range for the key
pub async fn update_setting(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(key): Path<String>,
    Json(req): Json<UpdateSettingRequest>,
) -> ApiResult<Json<PlatformSetting>> {
    require_current_role(&state.db, auth.user_id, AppRole::Admin).await?;

    let key: SettingKey = key.parse()?;
    let value = key.validate(&req.value)?;

    let setting =
        PlatformSetting::upsert(&state.db, key, JsonValue::from(value), auth.user_id).await?;

    info!(key = key.as_str(), value, admin = %auth.user_id, "Platform setting updated");
    Ok(Json(setting))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_effective_settings_fill_defaults() {
        let stored = vec![PlatformSetting {
            key: "commission_percent".to_string(),
            value: json!(15),
            updated_by: None,
            updated_at: Utc::now(),
        }];

        let views = effective_settings(&stored);
        assert_eq!(views.len(), SettingKey::ALL.len());

        let commission = views
            .iter()
            .find(|v| v.key == SettingKey::CommissionPercent)
            .unwrap();
        assert_eq!(commission.value, 15);
        assert!(!commission.is_default);

        let bonus = views
            .iter()
            .find(|v| v.key == SettingKey::SignupBonusPoints)
            .unwrap();
        assert_eq!(bonus.value, 50);
        assert!(bonus.is_default);
    }

    #[test]
    fn test_malformed_row_falls_back() {
        let stored = vec![PlatformSetting {
            key: "min_withdrawal".to_string(),
            value: json!("lots"),
            updated_by: None,
            updated_at: Utc::now(),
        }];

        let views = effective_settings(&stored);
        let min = views
            .iter()
            .find(|v| v.key == SettingKey::MinWithdrawal)
            .unwrap();
        assert_eq!(min.value, 100);
        assert!(min.is_default);
    }
}
