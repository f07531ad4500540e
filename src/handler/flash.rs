//! One-shot status messages carried to the next rendered page in a cookie.

use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use serde::{Deserialize, Serialize};

pub const FLASH_COOKIE: &str = "_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub category: Level,
    pub message: String,
}

/// Queue a message for the next page render.
pub fn push(jar: CookieJar, category: Level, message: impl Into<String>) -> CookieJar {
    let mut messages = read(&jar);
    messages.push(FlashMessage {
        category,
        message: message.into(),
    });

    jar.add(flash_cookie(encode(&messages)))
}

/// Drain the queued messages, clearing the cookie when there were any.
pub fn take(jar: CookieJar) -> (CookieJar, Vec<FlashMessage>) {
    let messages = read(&jar);
    if messages.is_empty() {
        return (jar, messages);
    }
    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), messages)
}

fn read(jar: &CookieJar) -> Vec<FlashMessage> {
    jar.get(FLASH_COOKIE)
        .and_then(|cookie| decode(cookie.value()))
        .unwrap_or_default()
}

fn flash_cookie(value: String) -> Cookie<'static> {
    Cookie::build((FLASH_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

// Hex keeps arbitrary message text inside the cookie value grammar.
fn encode(messages: &[FlashMessage]) -> String {
    let json = serde_json::to_vec(messages).unwrap_or_default();
    hex::encode(json)
}

fn decode(value: &str) -> Option<Vec<FlashMessage>> {
    let bytes = hex::decode(value).ok()?;
    serde_json::from_slice(&bytes).ok()
}
