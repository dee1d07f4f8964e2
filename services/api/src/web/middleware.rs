//! services/api/src/web/middleware.rs
//!
//! Anonymous browser-session middleware.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::web::response::ApiFailure;
use crate::web::state::{AppState, SessionId};

pub const SESSION_COOKIE: &str = "session_id";

/// Reads the `session_id` cookie value from a `Cookie` header.
pub fn session_cookie_value(cookie_header: &str) -> Option<&str> {
    cookie_header.split(';').find_map(|c| {
        let c = c.trim();
        c.strip_prefix(SESSION_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
    })
}

fn client_address(req: &Request) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        return forwarded.trim().to_string();
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default()
}

/// Attaches a [`SessionId`] to every request.
///
/// A valid, active session from the cookie is touched and reused. Otherwise a new
/// session is created and its cookie is set on the response.
pub async fn browser_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    // 1. Look for an existing session in the cookie
    let existing = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(session_cookie_value)
        .and_then(|raw| Uuid::parse_str(raw).ok());

    if let Some(session_id) = existing {
        if state.db.get_active_browser_session(session_id).await.is_ok() {
            if let Err(e) = state.db.touch_browser_session(session_id).await {
                warn!(session_id = %session_id, error = %e, "Failed to touch session");
            }
            req.extensions_mut().insert(SessionId(session_id));
            return next.run(req).await;
        }
    }

    // 2. Start a fresh session
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let session = match state
        .db
        .create_browser_session(&client_address(&req), &user_agent)
        .await
    {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to create browser session: {:?}", e);
            return ApiFailure::internal("SESSION_ERROR", "Failed to create session")
                .into_response();
        }
    };
    info!(session_id = %session.id, "New browser session");
    req.extensions_mut().insert(SessionId(session.id));

    // 3. Continue to the handler, then hand the cookie to the browser
    let mut response = next.run(req).await;
    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, session.id, state.config.session_ttl_secs
    );
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => error!("Invalid session cookie header: {}", e),
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_the_session_cookie_among_others() {
        let id = "0b8e4f2c-4b7a-4d6e-9a55-2f3c1d9e8a10";
        let header = format!("theme=dark; {}={}; lang=en", SESSION_COOKIE, id);
        assert_eq!(session_cookie_value(&header), Some(id));
    }

    #[test]
    fn similarly_named_cookies_are_ignored() {
        assert_eq!(session_cookie_value("session_id_old=abc; theme=dark"), None);
        assert_eq!(session_cookie_value(""), None);
    }
}
