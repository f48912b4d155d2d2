//! Authorization guard for protected routes.

use spin_sdk::http::Request;

use crate::core::db::user_key;
use crate::core::errors::{ApiResult, AuthError};
use crate::handlers::AppState;

pub fn bearer_token(req: &Request) -> Option<&str> {
    req.header("Authorization")?
        .as_str()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves the acting user for a protected request. Every failure,
/// whatever its cause, surfaces as `Unauthenticated`.
pub fn authenticate(state: &AppState, req: &Request) -> ApiResult<String> {
    let token = bearer_token(req).ok_or(AuthError::Unauthenticated)?;

    let user_id = state.credentials.verify(token).map_err(|err| {
        tracing::warn!(error = %err, "rejected bearer token");
        AuthError::Unauthenticated
    })?;

    if !state.store.exists(&user_key(&user_id))? {
        tracing::warn!(user_id = %user_id, "token for unknown user");
        return Err(AuthError::Unauthenticated.into());
    }

    Ok(user_id)
}
