//! Caller identity resolution.
//!
//! Shopdesk runs behind an authenticating proxy that forwards the signed-in
//! user's id in `x-user-id`. The id is resolved against the user store on
//! every request, so role changes take effect immediately. A missing,
//! malformed or unknown id resolves to no identity.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use shopdesk_core::{Role, UserId};

use crate::db::{UserRepository, UserStore};
use crate::error::AppError;
use crate::services::{Caller, authorize};
use crate::state::AppState;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Resolve the caller named by the `x-user-id` header.
///
/// # Errors
///
/// Returns `AppError::Storage` if the user lookup fails.
pub async fn resolve_caller<U: UserStore>(
    users: &U,
    headers: &HeaderMap,
) -> Result<Option<Caller>, AppError> {
    let Some(user_id) = headers
        .get(USER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<UserId>().ok())
    else {
        return Ok(None);
    };

    let Some(user) = users.get_by_id(user_id).await? else {
        tracing::debug!(%user_id, "Unknown user id in identity header");
        return Ok(None);
    };

    set_sentry_user(&user_id);
    Ok(Some(Caller::from(&user)))
}

/// Reject non-admin callers before any admin handler runs.
///
/// On success the resolved [`Caller`] is available to handlers as an
/// `Extension<Caller>`.
///
/// # Errors
///
/// Returns `AppError::Forbidden` when the caller is missing or not an admin.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let caller = resolve_caller(&UserRepository::new(state.pool()), request.headers()).await?;
    let caller = *authorize(caller.as_ref(), Role::Admin)?;

    tracing::Span::current().record("user_id", caller.user_id.as_i32());
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

/// Set the Sentry user context from a user ID.
fn set_sentry_user(user_id: &UserId) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}
