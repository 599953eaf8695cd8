//! Permission checks against verified claims.
//!
//! Permission strings are opaque capability labels matched exactly
//! (case-sensitive) against the token's `permissions` claim.

use crate::auth::claims::Claims;
use crate::auth::failure::AuthFailure;

pub const READ_EVENTS: &str = "read:events";
pub const CREATE_EVENTS: &str = "create:events";
pub const UPDATE_EVENTS: &str = "update:events";
pub const DELETE_EVENTS: &str = "delete:events";
pub const MANAGE_ATTENDEES: &str = "manage:attendees";
pub const CREATE_SCHEDULE: &str = "create:schedule";

/// Confirm that `claims` grant `required`.
///
/// # Errors
///
/// - `PermissionsMissing` - the token has no `permissions` claim
/// - `PermissionNotFound` - the claim exists but lacks `required`
pub fn check_permission(required: &str, claims: &Claims) -> Result<(), AuthFailure> {
    let permissions = claims.permissions().ok_or_else(|| {
        tracing::debug!(target: "events.auth.permissions", "Token carries no permissions claim");
        AuthFailure::PermissionsMissing
    })?;

    if !permissions.iter().any(|p| p == required) {
        tracing::debug!(
            target: "events.auth.permissions",
            required = %required,
            granted = permissions.len(),
            "Required permission not granted"
        );
        return Err(AuthFailure::PermissionNotFound);
    }

    Ok(())
}
