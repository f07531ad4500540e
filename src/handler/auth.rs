use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use serde::Serialize;
use std::sync::Arc;
use time::Duration;

use crate::error::AppError;
use crate::handler::flash::{self, Level};
use crate::repository::User;
use crate::services::user_service::UserService;

pub const SESSION_COOKIE: &str = "jwt_token";
pub const REMEMBER_ME_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub username: String,
    pub is_admin: bool,
}

impl AuthenticatedUser {
    /// Authors manage their own records, admins manage everyone's.
    pub fn can_manage(&self, owner_id: i64) -> bool {
        self.is_admin || self.user_id == owner_id
    }
}

impl From<User> for AuthenticatedUser {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            username: user.username,
            is_admin: user.is_admin,
        }
    }
}

/// The visitor behind a request, if they carry a valid session.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<AuthenticatedUser>);

impl CurrentUser {
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        self.0.as_ref()
    }
}

/// Middleware that resolves the session cookie into a [`CurrentUser`].
///
/// The token only names the account; the admin flag and the account's
/// existence come from the store on every request.
pub async fn load_session(
    Extension(users): Extension<Arc<UserService>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let user = match extract_session_token(&jar) {
        Some(token) => match users.session_user(&token).await {
            Ok(user) => user.map(AuthenticatedUser::from),
            Err(e) => {
                tracing::debug!("Ignoring session token: {}", e);
                None
            }
        },
        None => None,
    };

    request.extensions_mut().insert(CurrentUser(user));
    next.run(request).await
}

/// Middleware that requires a logged-in user, sending anonymous visitors to
/// the login page.
pub async fn require_auth(
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    match current.0 {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => {
            let target = format!("/login?next={}", request.uri().path());
            let jar = flash::push(jar, Level::Info, "Please log in to access this page.");
            (jar, Redirect::to(&target)).into_response()
        }
    }
}

/// Middleware that requires the admin flag. Must run after [`require_auth`].
pub async fn require_admin(
    Extension(user): Extension<AuthenticatedUser>,
    request: Request,
    next: Next,
) -> Response {
    if user.is_admin {
        next.run(request).await
    } else {
        tracing::warn!(user_id = user.user_id, uri = %request.uri(), "Admin access denied");
        AppError::forbidden("Administrator access required").into_response()
    }
}

/// Build the session cookie; `remember` makes it outlive the browser session.
pub fn session_cookie(token: String, remember: bool, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build();

    if remember {
        cookie.set_max_age(Duration::days(REMEMBER_ME_DAYS));
    }

    cookie
}

pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

/// Extract the session token from the cookie jar
fn extract_session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|token| !token.is_empty())
}
