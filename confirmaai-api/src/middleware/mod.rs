/// Middleware for the API server
///
/// - `auth`: bearer JWT check for the protected routes
/// - `security`: hardening response headers

pub mod auth;
pub mod security;
