use axum::{
    extract::{Extension, Form},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;
use tera::Tera;

use crate::domain::forms::{CsrfForm, FormErrors, JOB_TYPES, JobForm};
use crate::error::AppError;
use crate::handler::auth::{AuthenticatedUser, CurrentUser};
use crate::handler::csrf;
use crate::handler::flash::{self, Level};
use crate::handler::params::RecordId;
use crate::services::job_service::JobService;
use crate::views::{page_context, render};

fn render_job_form(
    tmpl: &Tera,
    user: &AuthenticatedUser,
    jar: CookieJar,
    title: &str,
    action: &str,
    form: &JobForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let (jar, mut ctx) = page_context(jar, Some(user), title);
    ctx.insert("legend", title);
    ctx.insert("action", action);
    ctx.insert("job_types", &JOB_TYPES);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    Ok((jar, render(tmpl, "create_job.html", &ctx)?).into_response())
}

// GET /careers
pub async fn careers(
    Extension(tmpl): Extension<Tera>,
    Extension(jobs): Extension<Arc<JobService>>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let all = jobs.list().await?;
    let (jar, mut ctx) = page_context(jar, current.user(), "Careers");
    ctx.insert("jobs", &all);
    Ok((jar, render(&tmpl, "careers.html", &ctx)?).into_response())
}

// GET /career/{job_id}
pub async fn job_opening(
    Extension(tmpl): Extension<Tera>,
    Extension(jobs): Extension<Arc<JobService>>,
    Extension(user): Extension<AuthenticatedUser>,
    RecordId(job_id): RecordId,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let job = jobs.get(job_id).await?;
    let (jar, mut ctx) = page_context(jar, Some(&user), &job.title);
    ctx.insert("job", &job);
    Ok((jar, render(&tmpl, "job_opening.html", &ctx)?).into_response())
}

// GET /create_job
pub async fn create_job_page(
    Extension(tmpl): Extension<Tera>,
    Extension(user): Extension<AuthenticatedUser>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    render_job_form(
        &tmpl,
        &user,
        jar,
        "Create Job Posting",
        "/create_job",
        &JobForm::default(),
        &FormErrors::default(),
    )
}

// POST /create_job
pub async fn create_job(
    Extension(tmpl): Extension<Tera>,
    Extension(jobs): Extension<Arc<JobService>>,
    Extension(user): Extension<AuthenticatedUser>,
    jar: CookieJar,
    Form(form): Form<JobForm>,
) -> Result<Response, AppError> {
    csrf::verify(&jar, &form.csrf_token)?;
    let form = form.normalized();

    match jobs.create(&form).await {
        Ok(_) => {
            let jar = flash::push(jar, Level::Success, "The job posting has been created.");
            Ok((jar, Redirect::to("/careers")).into_response())
        }
        Err(AppError::Validation(errors)) => render_job_form(
            &tmpl,
            &user,
            jar,
            "Create Job Posting",
            "/create_job",
            &form,
            &errors,
        ),
        Err(e) => Err(e),
    }
}

// GET /job/{job_id}/update
pub async fn update_job_page(
    Extension(tmpl): Extension<Tera>,
    Extension(jobs): Extension<Arc<JobService>>,
    Extension(user): Extension<AuthenticatedUser>,
    RecordId(job_id): RecordId,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let job = jobs.get(job_id).await?;
    render_job_form(
        &tmpl,
        &user,
        jar,
        "Update Job Posting",
        &format!("/job/{}/update", job_id),
        &JobForm::from_job(&job),
        &FormErrors::default(),
    )
}

// POST /job/{job_id}/update
pub async fn update_job(
    Extension(tmpl): Extension<Tera>,
    Extension(jobs): Extension<Arc<JobService>>,
    Extension(user): Extension<AuthenticatedUser>,
    RecordId(job_id): RecordId,
    jar: CookieJar,
    Form(form): Form<JobForm>,
) -> Result<Response, AppError> {
    csrf::verify(&jar, &form.csrf_token)?;
    let form = form.normalized();

    match jobs.update(job_id, &form).await {
        Ok(job) => {
            let jar = flash::push(jar, Level::Success, "The job posting has been updated.");
            Ok((jar, Redirect::to(&format!("/career/{}", job.job_id))).into_response())
        }
        Err(AppError::Validation(errors)) => render_job_form(
            &tmpl,
            &user,
            jar,
            "Update Job Posting",
            &format!("/job/{}/update", job_id),
            &form,
            &errors,
        ),
        Err(e) => Err(e),
    }
}

// POST /job/{job_id}/delete
pub async fn delete_job(
    Extension(jobs): Extension<Arc<JobService>>,
    RecordId(job_id): RecordId,
    jar: CookieJar,
    Form(form): Form<CsrfForm>,
) -> Result<Response, AppError> {
    csrf::verify(&jar, &form.csrf_token)?;
    jobs.delete(job_id).await?;

    let jar = flash::push(jar, Level::Success, "The job posting has been deleted.");
    Ok((jar, Redirect::to("/careers")).into_response())
}
