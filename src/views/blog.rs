use axum::{
    extract::{Extension, Form, Multipart},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;
use tera::Tera;

use crate::domain::forms::{CsrfForm, FormErrors, PostForm};
use crate::error::AppError;
use crate::handler::auth::{AuthenticatedUser, CurrentUser};
use crate::handler::csrf;
use crate::handler::flash::{self, Level};
use crate::handler::params::RecordId;
use crate::services::post_service::PostService;
use crate::views::{page_context, render};

/// Shared by the new-post and edit-post pages.
fn render_post_form(
    tmpl: &Tera,
    user: &AuthenticatedUser,
    jar: CookieJar,
    legend: &str,
    action: &str,
    form: &PostForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let (jar, mut ctx) = page_context(jar, Some(user), legend);
    ctx.insert("legend", legend);
    ctx.insert("action", action);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    Ok((jar, render(tmpl, "create_post.html", &ctx)?).into_response())
}

// GET /blog
pub async fn blog(
    Extension(tmpl): Extension<Tera>,
    Extension(posts): Extension<Arc<PostService>>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let all = posts.list_all().await?;
    let (jar, mut ctx) = page_context(jar, current.user(), "Blog");
    ctx.insert("posts", &all);
    Ok((jar, render(&tmpl, "blog.html", &ctx)?).into_response())
}

// GET /post/{post_id}
pub async fn post_detail(
    Extension(tmpl): Extension<Tera>,
    Extension(posts): Extension<Arc<PostService>>,
    Extension(current): Extension<CurrentUser>,
    RecordId(post_id): RecordId,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let post = posts.get(post_id).await?;
    let can_edit = current
        .user()
        .is_some_and(|user| user.can_manage(post.author_id));

    let (jar, mut ctx) = page_context(jar, current.user(), &post.title);
    ctx.insert("post", &post);
    ctx.insert("can_edit", &can_edit);
    Ok((jar, render(&tmpl, "post.html", &ctx)?).into_response())
}

// GET /create_post
pub async fn create_post_page(
    Extension(tmpl): Extension<Tera>,
    Extension(user): Extension<AuthenticatedUser>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    render_post_form(
        &tmpl,
        &user,
        jar,
        "New Post",
        "/create_post",
        &PostForm::default(),
        &FormErrors::default(),
    )
}

// POST /create_post
pub async fn create_post(
    Extension(tmpl): Extension<Tera>,
    Extension(posts): Extension<Arc<PostService>>,
    Extension(user): Extension<AuthenticatedUser>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = PostForm::from_multipart(multipart).await?;
    csrf::verify(&jar, &form.csrf_token)?;

    match posts.create(&user, &form).await {
        Ok(_) => {
            let jar = flash::push(jar, Level::Success, "Your post has been created!");
            Ok((jar, Redirect::to("/blog")).into_response())
        }
        Err(AppError::Validation(errors)) => render_post_form(
            &tmpl,
            &user,
            jar,
            "New Post",
            "/create_post",
            &form,
            &errors,
        ),
        Err(e) => Err(e),
    }
}

// GET /post/{post_id}/update
pub async fn update_post_page(
    Extension(tmpl): Extension<Tera>,
    Extension(posts): Extension<Arc<PostService>>,
    Extension(user): Extension<AuthenticatedUser>,
    RecordId(post_id): RecordId,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let post = posts.editable(&user, post_id).await?;
    render_post_form(
        &tmpl,
        &user,
        jar,
        "Update Post",
        &format!("/post/{}/update", post_id),
        &PostForm::from_post(&post),
        &FormErrors::default(),
    )
}

// POST /post/{post_id}/update
pub async fn update_post(
    Extension(tmpl): Extension<Tera>,
    Extension(posts): Extension<Arc<PostService>>,
    Extension(user): Extension<AuthenticatedUser>,
    RecordId(post_id): RecordId,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = PostForm::from_multipart(multipart).await?;
    csrf::verify(&jar, &form.csrf_token)?;

    match posts.update(&user, post_id, &form).await {
        Ok(post) => {
            let jar = flash::push(jar, Level::Success, "Your post has been updated!");
            Ok((jar, Redirect::to(&format!("/post/{}", post.post_id))).into_response())
        }
        Err(AppError::Validation(errors)) => render_post_form(
            &tmpl,
            &user,
            jar,
            "Update Post",
            &format!("/post/{}/update", post_id),
            &form,
            &errors,
        ),
        Err(e) => Err(e),
    }
}

// POST /post/{post_id}/delete
pub async fn delete_post(
    Extension(posts): Extension<Arc<PostService>>,
    Extension(user): Extension<AuthenticatedUser>,
    RecordId(post_id): RecordId,
    jar: CookieJar,
    Form(form): Form<CsrfForm>,
) -> Result<Response, AppError> {
    csrf::verify(&jar, &form.csrf_token)?;
    posts.delete(&user, post_id).await?;

    let jar = flash::push(jar, Level::Success, "Your post has been deleted.");
    Ok((jar, Redirect::to("/blog")).into_response())
}
