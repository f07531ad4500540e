use axum::{
    extract::{Extension, Form},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;
use tera::Tera;

use crate::domain::forms::{ContactForm, FormErrors, FormSchema};
use crate::error::AppError;
use crate::handler::auth::{AuthenticatedUser, CurrentUser};
use crate::handler::csrf;
use crate::handler::flash::{self, Level};
use crate::services::post_service::PostService;
use crate::views::{page_context, render};

// GET / and /home
pub async fn index(
    Extension(tmpl): Extension<Tera>,
    Extension(posts): Extension<Arc<PostService>>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let recent = posts.list_recent().await?;
    let (jar, mut ctx) = page_context(jar, current.user(), "Home");
    ctx.insert("posts", &recent);
    Ok((jar, render(&tmpl, "home.html", &ctx)?).into_response())
}

fn static_page(
    tmpl: &Tera,
    current: &CurrentUser,
    jar: CookieJar,
    template: &str,
    title: &str,
) -> Result<Response, AppError> {
    let (jar, ctx) = page_context(jar, current.user(), title);
    Ok((jar, render(tmpl, template, &ctx)?).into_response())
}

// GET /about
pub async fn about(
    Extension(tmpl): Extension<Tera>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    static_page(&tmpl, &current, jar, "about.html", "About Us")
}

// GET /services
pub async fn services(
    Extension(tmpl): Extension<Tera>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    static_page(&tmpl, &current, jar, "services.html", "Our Services")
}

// GET /for-clients
pub async fn for_clients(
    Extension(tmpl): Extension<Tera>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    static_page(&tmpl, &current, jar, "for_clients.html", "For Clients")
}

// GET /for-hire
pub async fn for_hire(
    Extension(tmpl): Extension<Tera>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    static_page(&tmpl, &current, jar, "for_hire.html", "For Hire")
}

fn render_contact(
    tmpl: &Tera,
    user: &AuthenticatedUser,
    jar: CookieJar,
    form: &ContactForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let (jar, mut ctx) = page_context(jar, Some(user), "Contact Us");
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    Ok((jar, render(tmpl, "contact.html", &ctx)?).into_response())
}

// GET /contact
pub async fn contact(
    Extension(tmpl): Extension<Tera>,
    Extension(user): Extension<AuthenticatedUser>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    render_contact(
        &tmpl,
        &user,
        jar,
        &ContactForm::default(),
        &FormErrors::default(),
    )
}

// POST /contact
pub async fn contact_post(
    Extension(tmpl): Extension<Tera>,
    Extension(user): Extension<AuthenticatedUser>,
    jar: CookieJar,
    Form(form): Form<ContactForm>,
) -> Result<Response, AppError> {
    csrf::verify(&jar, &form.csrf_token)?;
    let form = form.normalized();

    if let Err(errors) = form.check() {
        return render_contact(&tmpl, &user, jar, &form, &errors);
    }

    // No mail transport; the message is only recorded in the log.
    tracing::info!(
        user_id = user.user_id,
        name = %form.name,
        email = %form.email,
        subject = %form.subject,
        "Contact message received"
    );

    let jar = flash::push(
        jar,
        Level::Success,
        format!(
            "Thank you for your message, {}! We will get back to you shortly.",
            form.name
        ),
    );
    Ok((jar, Redirect::to("/contact")).into_response())
}
