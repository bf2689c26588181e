//! Explicit authorization guards.
//!
//! Handlers call these before doing any work. A guard either allows the
//! request or denies it with a reason; it performs no IO and never mutates
//! anything.

use thiserror::Error;

use crate::context::RequestContext;
use crate::permissions::Permission;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Check a set of granted permissions against a required one.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(granted: &[Permission], required: &Permission) -> Result<(), AuthzError> {
    if granted
        .iter()
        .any(|p| p.is_wildcard() || p == required)
    {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Require the request to be authorized as the owning customer.
pub fn require_owner(ctx: &RequestContext) -> Result<(), AuthzError> {
    if ctx.authorized_as_owner_only() {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(Permission::owner().as_str().to_string()))
    }
}
