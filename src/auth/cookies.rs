//! The `admin_session` cookie.

use cookie::time::{Duration, OffsetDateTime};
use cookie::{Cookie, SameSite};

pub const SESSION_COOKIE_NAME: &str = "admin_session";

/// HttpOnly session cookie valid for `days`.
pub fn session_cookie(token: &str, days: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::days(days))
        .build()
}

/// Cookie that makes the browser drop the session.
pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::ZERO)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build()
}

/// Session token from a `Cookie` request header value, if present and non-empty.
pub fn session_token_from_header(header: &str) -> Option<String> {
    Cookie::split_parse(header)
        .filter_map(Result::ok)
        .find(|c| c.name() == SESSION_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Session token from a `Set-Cookie` response header value.
pub fn session_token_from_set_cookie(header: &str) -> Option<String> {
    Cookie::parse(header)
        .ok()
        .filter(|c| c.name() == SESSION_COOKIE_NAME)
        .map(|c| c.value().to_string())
}
