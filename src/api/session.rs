use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::debug;

use crate::repo::{DeviceRegistry, SessionId};

pub const SESSION_COOKIE: &str = "load_session";

/// Session named by the request's cookie, if it carries a well-formed one.
pub fn current(jar: &CookieJar) -> Option<SessionId> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| cookie.value().parse().ok())
}

/// Reuse the caller's session if the registry knows it, otherwise start a new one
/// and hand its cookie back.
pub fn resolve(jar: CookieJar, registry: &DeviceRegistry) -> (SessionId, CookieJar) {
    if let Some(session) = current(&jar).filter(|s| registry.contains(*s)) {
        return (session, jar);
    }

    let session = SessionId::new();
    debug!(%session, "starting new session");
    (session, jar.add(session_cookie(session)))
}

fn session_cookie(session: SessionId) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}
