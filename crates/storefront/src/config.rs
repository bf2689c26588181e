//! Order operation options.

use chrono::Duration;

/// Configuration for order access policy.
#[derive(Debug, Clone)]
pub struct OrderOptions {
    /// How long after placement a guest may still look an order up by code.
    pub anonymous_access_window: Duration,
}

impl Default for OrderOptions {
    fn default() -> Self {
        Self {
            anonymous_access_window: Duration::hours(2),
        }
    }
}
