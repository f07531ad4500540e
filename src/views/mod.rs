use axum::response::Html;
use axum_extra::extract::CookieJar;
use tera::{Context, Tera};

use crate::error::AppError;
use crate::handler::auth::AuthenticatedUser;
use crate::handler::{csrf, flash};

pub mod auth;
pub mod blog;
pub mod careers;
pub mod pages;

/// Context shared by every page: title, pending flashes, CSRF token and the
/// logged-in user. The returned jar must go out with the response.
pub fn page_context(
    jar: CookieJar,
    user: Option<&AuthenticatedUser>,
    title: &str,
) -> (CookieJar, Context) {
    let (jar, messages) = flash::take(jar);
    let (jar, csrf_token) = csrf::ensure_token(jar);

    let mut ctx = Context::new();
    ctx.insert("title", title);
    ctx.insert("messages", &messages);
    ctx.insert("csrf_token", &csrf_token);
    ctx.insert("current_user", &user);
    (jar, ctx)
}

pub fn render(tmpl: &Tera, template: &str, ctx: &Context) -> Result<Html<String>, AppError> {
    Ok(Html(tmpl.render(template, ctx)?))
}
