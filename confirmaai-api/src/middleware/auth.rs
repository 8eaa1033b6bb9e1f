/// JWT authentication layer
///
/// Validates the `Authorization: Bearer <access token>` header and inserts
/// the caller's `AuthContext` into the request extensions, where handlers
/// pick it up with `Extension<AuthContext>`.

use crate::{app::AppState, error::ApiError};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use confirmaai_shared::auth::middleware::authenticate;

pub async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(req.headers(), state.jwt_secret())?;

    tracing::debug!(user_id = %auth_context.user_id, "Authenticated request");
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
