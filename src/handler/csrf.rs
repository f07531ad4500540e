//! Double-submit CSRF protection: the token lives in a cookie and every form
//! echoes it back in a `csrf_token` field.

use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use rand::{Rng, thread_rng};

use crate::error::AppError;

pub const CSRF_COOKIE: &str = "csrf_token";

/// Return the jar's token, minting one when the visitor has none yet.
pub fn ensure_token(jar: CookieJar) -> (CookieJar, String) {
    if let Some(token) = current_token(&jar) {
        return (jar, token);
    }

    let token_bytes: [u8; 32] = thread_rng().r#gen();
    let token = hex::encode(token_bytes);
    let cookie = Cookie::build((CSRF_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    (jar.add(cookie), token)
}

pub fn verify(jar: &CookieJar, submitted: &str) -> Result<(), AppError> {
    match current_token(jar) {
        Some(expected) if !submitted.is_empty() && expected == submitted => Ok(()),
        _ => Err(AppError::bad_request("The CSRF token is missing or invalid.")),
    }
}

fn current_token(jar: &CookieJar) -> Option<String> {
    jar.get(CSRF_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}
