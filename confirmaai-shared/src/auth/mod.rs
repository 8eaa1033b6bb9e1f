/// Authentication utilities
///
/// Clinic users log in with email and password and then authenticate every
/// request with a short-lived access token.
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: Access/refresh token generation and validation
/// - [`middleware`]: Axum middleware that turns a bearer token into an [`middleware::AuthContext`]
///
/// # Example
///
/// ```no_run
/// use confirmaai_shared::auth::password::{hash_password, verify_password};
/// use confirmaai_shared::auth::jwt::{create_token, validate_access_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("segredo123")?;
/// assert!(verify_password("segredo123", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), TokenType::Access);
/// let token = create_token(&claims, "a-secret-of-at-least-thirty-two-bytes")?;
/// let validated = validate_access_token(&token, "a-secret-of-at-least-thirty-two-bytes")?;
/// assert_eq!(validated.sub, claims.sub);
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
pub mod password;
