use axum::{
    extract::{Extension, Request},
    http::{StatusCode, Uri},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use tera::Tera;
use uuid::Uuid;

use crate::handler::auth::CurrentUser;

/// Information for errors struct
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub error_id: String,
    pub status_code: u16,
    pub message: String,
    pub path: Option<String>,
    pub details: Option<String>,
}

impl ErrorInfo {
    pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            error_id: Uuid::new_v4().to_string(),
            status_code: status_code.as_u16(),
            message: message.into(),
            path: None,
            details: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    fn template(&self) -> (&'static str, &'static str) {
        match self.status_code {
            403 => ("errors/403.html", "403 - Access Denied"),
            404 => ("errors/404.html", "404 - Page not found"),
            400..=499 => ("errors/400.html", "400 - Bad Request"),
            _ => ("errors/500.html", "500 - Internal error"),
        }
    }
}

/// Renders the error page for `info`, falling back to plain text when the
/// template itself is broken.
pub fn render_error_page(tmpl: &Tera, info: &ErrorInfo, current_user: &CurrentUser) -> Response {
    let status =
        StatusCode::from_u16(info.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    match status.as_u16() {
        500..=599 => tracing::error!(
            error_id = %info.error_id,
            message = %info.message,
            details = ?info.details,
            path = ?info.path,
            "Internal server error occurred"
        ),
        404 => tracing::warn!("404 Not Found: {}", info.path.as_deref().unwrap_or("-")),
        _ => {}
    }

    let (template, title) = info.template();
    let mut ctx = tera::Context::new();
    ctx.insert("title", title);
    ctx.insert("error", info);
    ctx.insert("current_user", &current_user.0);

    match tmpl.render(template, &ctx) {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render {} template: {:?}", template, e);
            let fallback = status.canonical_reason().unwrap_or("Error");
            (status, format!("{} - Template error", fallback)).into_response()
        }
    }
}

/// Turns responses tagged with an [`ErrorInfo`] into rendered error pages.
pub async fn render_error_pages(
    Extension(tmpl): Extension<Tera>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let current_user = request
        .extensions()
        .get::<CurrentUser>()
        .cloned()
        .unwrap_or_default();

    let response = next.run(request).await;

    match response.extensions().get::<ErrorInfo>() {
        Some(info) => {
            let info = info.clone().with_path(path);
            render_error_page(&tmpl, &info, &current_user)
        }
        None => response,
    }
}

/// Fallback for unmatched routes.
pub async fn handle_404(uri: Uri) -> Response {
    let info = ErrorInfo::new(StatusCode::NOT_FOUND, "Page not found").with_path(uri.path());
    let mut response = (StatusCode::NOT_FOUND, info.message.clone()).into_response();
    response.extensions_mut().insert(info);
    response
}
