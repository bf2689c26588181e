//! `tradewind-auth` — permissions, request context, and session handling.
//!
//! Permission checks are explicit guard functions evaluated before a handler
//! runs; there is no decorator or middleware magic. The session's active-order
//! binding is a single-writer relation mutated only through [`AuthService`].

pub mod context;
pub mod guard;
pub mod permissions;
pub mod session;

pub use context::RequestContext;
pub use guard::{authorize, require_owner, AuthzError};
pub use permissions::Permission;
pub use session::{AuthService, Session};
