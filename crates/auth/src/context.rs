//! Per-request context.

use tradewind_core::{Channel, UserId};

use crate::session::Session;

/// Context for a single request: channel, session, and active-user identity.
///
/// Every mutating operation on an order requires one. Constructed by the
/// out-of-scope API layer; the core treats it as already resolved.
#[derive(Debug, Clone)]
pub struct RequestContext {
    channel: Channel,
    session: Option<Session>,
    active_user_id: Option<UserId>,
    authorized_as_owner_only: bool,
}

impl RequestContext {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            session: None,
            active_user_id: None,
            authorized_as_owner_only: false,
        }
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.active_user_id = session.user;
        self.session = Some(session);
        self
    }

    pub fn owner_only(mut self) -> Self {
        self.authorized_as_owner_only = true;
        self
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    pub fn active_user_id(&self) -> Option<UserId> {
        self.active_user_id
    }

    /// True when the caller was admitted under owner permissions only, i.e.
    /// they may touch nothing beyond their own session's resources.
    pub fn authorized_as_owner_only(&self) -> bool {
        self.authorized_as_owner_only
    }
}
