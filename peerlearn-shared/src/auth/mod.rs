/// Authentication and authorization utilities
///
/// This module provides the authentication primitives for PeerLearn:
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength validation
/// - [`jwt`]: JWT token generation and validation (roles travel in the claims)
/// - [`middleware`]: Axum middleware that turns a Bearer token into an [`middleware::AuthContext`]
/// - [`authorization`]: Role and ownership checks used by route handlers
///
/// # Example
///
/// ```no_run
/// use peerlearn_shared::auth::password::{hash_password, verify_password};
/// use peerlearn_shared::auth::jwt::{create_token, Claims, TokenType};
/// use peerlearn_shared::models::role::AppRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Correct1Horse")?;
/// assert!(verify_password("Correct1Horse", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), vec![AppRole::Student], TokenType::Access);
/// let token = create_token(&claims, "secret-key-at-least-32-bytes-long!!")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
