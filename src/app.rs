use axum::{
    Router,
    extract::{DefaultBodyLimit, Extension},
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tera::Tera;
use tower_http::services::ServeDir;

use crate::api;
use crate::api::health::SharedProbe;
use crate::config::Settings;
use crate::handler::auth::{load_session, require_admin, require_auth};
use crate::handler::errors::{handle_404, render_error_pages};
use crate::handler::logging::request_logging_middleware;
use crate::repository::{JobRepository, PostRepository, UserRepository};
use crate::services::{
    image_service::ImageStore, job_service::JobService, jwt_service::JwtService,
    post_service::PostService, user_service::UserService,
};
use crate::views;

/// Everything the handlers pull out of request extensions.
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<UserService>,
    pub posts: Arc<PostService>,
    pub jobs: Arc<JobService>,
    pub probe: SharedProbe,
}

impl AppServices {
    pub fn new(
        settings: &Settings,
        user_repo: Arc<dyn UserRepository>,
        post_repo: Arc<dyn PostRepository>,
        job_repo: Arc<dyn JobRepository>,
        probe: SharedProbe,
    ) -> Self {
        let jwt = Arc::new(
            JwtService::new(&settings.secret_key)
                .with_ttl(chrono::Duration::hours(settings.session_ttl_hours)),
        );
        let images = Arc::new(ImageStore::new(settings.upload_dir.clone()));

        Self {
            users: Arc::new(UserService::new(user_repo, jwt)),
            posts: Arc::new(PostService::new(post_repo, images)),
            jobs: Arc::new(JobService::new(job_repo)),
            probe,
        }
    }
}

pub fn build_app(settings: Arc<Settings>, tera: Tera, services: AppServices) -> Router {
    let public_router = Router::new()
        .route("/", get(views::pages::index))
        .route("/home", get(views::pages::index))
        .route("/about", get(views::pages::about))
        .route("/services", get(views::pages::services))
        .route("/careers", get(views::careers::careers))
        .route("/blog", get(views::blog::blog))
        .route("/post/{post_id}", get(views::blog::post_detail))
        .route(
            "/register",
            get(views::auth::register_page).post(views::auth::register_post),
        )
        .route(
            "/login",
            get(views::auth::login_page).post(views::auth::login_post),
        )
        .route("/logout", get(views::auth::logout))
        .route("/api/health", get(api::health::health_check))
        .route("/api/health/ready", get(api::health::readiness_check))
        .route("/api/health/live", get(api::health::liveness_check));

    let protected_router = Router::new()
        .route("/for-clients", get(views::pages::for_clients))
        .route("/for-hire", get(views::pages::for_hire))
        .route("/career/{job_id}", get(views::careers::job_opening))
        .route(
            "/contact",
            get(views::pages::contact).post(views::pages::contact_post),
        )
        .route(
            "/create_post",
            get(views::blog::create_post_page).post(views::blog::create_post),
        )
        .route(
            "/post/{post_id}/update",
            get(views::blog::update_post_page).post(views::blog::update_post),
        )
        .route("/post/{post_id}/delete", post(views::blog::delete_post))
        .route_layer(from_fn(require_auth));

    let admin_router = Router::new()
        .route(
            "/create_job",
            get(views::careers::create_job_page).post(views::careers::create_job),
        )
        .route(
            "/job/{job_id}/update",
            get(views::careers::update_job_page).post(views::careers::update_job),
        )
        .route("/job/{job_id}/delete", post(views::careers::delete_job))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn(require_auth));

    Router::new()
        .merge(public_router)
        .merge(protected_router)
        .merge(admin_router)
        .nest_service("/static", ServeDir::new(&settings.static_dir))
        .nest_service("/uploads", ServeDir::new(&settings.upload_dir))
        .fallback(handle_404)
        .layer(DefaultBodyLimit::max(settings.max_upload_bytes))
        // error pages need CurrentUser, so the session is loaded outside them
        .layer(from_fn(render_error_pages))
        .layer(from_fn(load_session))
        .layer(from_fn(request_logging_middleware))
        // Extensions
        .layer(Extension(tera))
        .layer(Extension(services.users))
        .layer(Extension(services.posts))
        .layer(Extension(services.jobs))
        .layer(Extension(services.probe))
        .layer(Extension(settings))
}
