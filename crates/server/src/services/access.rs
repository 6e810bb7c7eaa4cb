//! Caller identity and the role guard shared by routes and services.

use shopdesk_core::{Role, UserId};

use crate::error::AppError;
use crate::models::User;

/// The resolved identity of whoever is making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Role,
}

impl Caller {
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

impl From<&User> for Caller {
    fn from(user: &User) -> Self {
        Self::new(user.id, user.role())
    }
}

/// Require a caller holding at least `required`.
///
/// Every privileged operation goes through this check before it touches any
/// state. A missing identity is rejected the same way as an insufficient role.
///
/// # Errors
///
/// Returns `AppError::Forbidden` when there is no caller or its role does
/// not satisfy `required`.
pub fn authorize(caller: Option<&Caller>, required: Role) -> Result<&Caller, AppError> {
    let caller = caller.ok_or_else(|| AppError::Forbidden("authentication required".to_owned()))?;

    if !caller.role.satisfies(required) {
        tracing::warn!(
            user_id = %caller.user_id,
            role = %caller.role,
            required = %required,
            "Caller lacks required role"
        );
        return Err(AppError::Forbidden(format!("{required} role required")));
    }

    Ok(caller)
}
