use axum::{
    extract::{Extension, Form, Query},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use tera::Tera;

use crate::config::Settings;
use crate::domain::forms::{FormErrors, FormSchema, LoginForm, RegisterForm};
use crate::error::AppError;
use crate::handler::auth::{CurrentUser, REMEMBER_ME_DAYS, clear_session, session_cookie};
use crate::handler::csrf;
use crate::handler::flash::{self, Level};
use crate::services::user_service::UserService;
use crate::views::{page_context, render};

const LOGIN_FAILED: &str = "Login unsuccessful. Please check your credentials.";

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

impl NextQuery {
    /// Only same-site absolute paths are followed after login.
    pub fn safe_target(&self) -> Option<&str> {
        self.next.as_deref().filter(|next| is_local_path(next))
    }
}

fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}

fn render_register(
    tmpl: &Tera,
    jar: CookieJar,
    form: &RegisterForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let (jar, mut ctx) = page_context(jar, None, "Register");
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    Ok((jar, render(tmpl, "register.html", &ctx)?).into_response())
}

fn render_login(
    tmpl: &Tera,
    jar: CookieJar,
    form: &LoginForm,
    errors: &FormErrors,
    next: Option<&str>,
) -> Result<Response, AppError> {
    let (jar, mut ctx) = page_context(jar, None, "Login");
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    ctx.insert("next", &next);
    Ok((jar, render(tmpl, "login.html", &ctx)?).into_response())
}

// GET /register
pub async fn register_page(
    Extension(tmpl): Extension<Tera>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if current.user().is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    render_register(&tmpl, jar, &RegisterForm::default(), &FormErrors::default())
}

// POST /register
pub async fn register_post(
    Extension(tmpl): Extension<Tera>,
    Extension(users): Extension<Arc<UserService>>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    if current.user().is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    csrf::verify(&jar, &form.csrf_token)?;
    let form = form.normalized();

    match users.register(&form).await {
        Ok(_) => {
            let jar = flash::push(
                jar,
                Level::Success,
                "Your account has been created! You can now log in.",
            );
            Ok((jar, Redirect::to("/login")).into_response())
        }
        Err(AppError::Validation(errors)) => render_register(&tmpl, jar, &form, &errors),
        Err(e) => Err(e),
    }
}

// GET /login
pub async fn login_page(
    Extension(tmpl): Extension<Tera>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<NextQuery>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if current.user().is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    render_login(
        &tmpl,
        jar,
        &LoginForm::default(),
        &FormErrors::default(),
        query.safe_target(),
    )
}

// POST /login
pub async fn login_post(
    Extension(tmpl): Extension<Tera>,
    Extension(users): Extension<Arc<UserService>>,
    Extension(settings): Extension<Arc<Settings>>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<NextQuery>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if current.user().is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    csrf::verify(&jar, &form.csrf_token)?;

    if let Err(errors) = form.check() {
        return render_login(&tmpl, jar, &form, &errors, query.safe_target());
    }

    let remember = form.remember_me();
    let ttl = if remember {
        chrono::Duration::days(REMEMBER_ME_DAYS)
    } else {
        chrono::Duration::hours(settings.session_ttl_hours)
    };

    match users.login(&form.identity, &form.password, ttl).await {
        Ok(outcome) => {
            tracing::info!(user_id = outcome.user.user_id, "User logged in");
            let jar = jar.add(session_cookie(outcome.token, remember, settings.cookie_secure));
            let target = query.safe_target().unwrap_or("/").to_string();
            Ok((jar, Redirect::to(&target)).into_response())
        }
        Err(e) => {
            tracing::warn!(identity = %form.identity, "Login failed: {}", e);
            let errors = FormErrors::single("identity", LOGIN_FAILED);
            let page = render_login(&tmpl, jar, &form, &errors, query.safe_target())?;
            Ok((StatusCode::UNAUTHORIZED, page).into_response())
        }
    }
}

// GET /logout
pub async fn logout(jar: CookieJar) -> Response {
    let jar = clear_session(jar);
    let jar = flash::push(jar, Level::Info, "You have been logged out.");
    (jar, Redirect::to("/")).into_response()
}
