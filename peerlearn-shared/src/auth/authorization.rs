/// Authorization helpers and permission checks
///
/// PeerLearn has three roles (see [`AppRole`]): every account is a student,
/// approved applicants are also teachers, and admins moderate. Most checks
/// use the roles carried by the access token; operations that must see a
/// role revocation immediately use [`require_current_role`], which reads
/// `user_roles`.
///
/// # Example
///
/// ```
/// use peerlearn_shared::auth::authorization::{require_owner, require_role};
/// use peerlearn_shared::auth::middleware::AuthContext;
/// use peerlearn_shared::models::role::AppRole;
/// use uuid::Uuid;
///
/// let teacher = AuthContext::from_jwt(Uuid::new_v4(), vec![AppRole::Student, AppRole::Teacher]);
/// assert!(require_role(&teacher, AppRole::Teacher).is_ok());
/// assert!(require_role(&teacher, AppRole::Admin).is_err());
/// assert!(require_owner(&teacher, teacher.user_id).is_ok());
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::role::{AppRole, UserRole};

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Caller lacks the role
    #[error("Requires role {0}")]
    MissingRole(AppRole),

    /// Caller neither owns the resource nor is an admin
    #[error("Not authorized to access this resource")]
    NotOwner,

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Requires the token to carry `role`; admins always pass
pub fn require_role(auth: &AuthContext, role: AppRole) -> Result<(), AuthzError> {
    if auth.has_role(role) || auth.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::MissingRole(role))
    }
}

/// Requires the caller to be `owner_id` or an admin
pub fn require_owner(auth: &AuthContext, owner_id: Uuid) -> Result<(), AuthzError> {
    if auth.owns_or_admin(owner_id) {
        Ok(())
    } else {
        Err(AuthzError::NotOwner)
    }
}

/// Requires `role` to be present in `user_roles` right now
///
/// Unlike [`require_role`] this ignores the token and consults the database,
/// and admins do not get a bypass.
pub async fn require_current_role(
    pool: &PgPool,
    user_id: Uuid,
    role: AppRole,
) -> Result<(), AuthzError> {
    if UserRole::has_role(pool, user_id, role).await? {
        Ok(())
    } else {
        Err(AuthzError::MissingRole(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_role() {
        let student = AuthContext::from_jwt(Uuid::new_v4(), vec![AppRole::Student]);
        assert!(require_role(&student, AppRole::Student).is_ok());
        assert!(matches!(
            require_role(&student, AppRole::Teacher),
            Err(AuthzError::MissingRole(AppRole::Teacher))
        ));
    }

    #[test]
    fn test_admin_passes_role_checks() {
        let admin = AuthContext::from_jwt(Uuid::new_v4(), vec![AppRole::Admin]);
        assert!(require_role(&admin, AppRole::Teacher).is_ok());
        assert!(require_owner(&admin, Uuid::new_v4()).is_ok());
    }

    #[test]
    fn test_require_owner() {
        let user = AuthContext::from_jwt(Uuid::new_v4(), vec![AppRole::Student]);
        assert!(require_owner(&user, user.user_id).is_ok());
        assert!(matches!(
            require_owner(&user, Uuid::new_v4()),
            Err(AuthzError::NotOwner)
        ));
    }
}
