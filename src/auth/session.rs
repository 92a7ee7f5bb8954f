//! Server-side sessions, carried by an opaque cookie.

use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

use crate::config::SessionConfig;

/// Session key holding the authenticated user's id.
pub const USER_ID_KEY: &str = "user_id";

pub fn create_session_layer(
    store: MemoryStore,
    config: &SessionConfig,
) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(store)
        .with_name(config.cookie_name.clone())
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::minutes(config.ttl_minutes),
        ))
        .with_secure(config.secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
