use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Instant;
use tracing::{Level, debug, error, info};

/// Store request information
#[derive(Debug)]
pub struct RequestInfo {
    pub method: String,
    pub uri: String,
    pub remote_addr: Option<SocketAddr>,
    pub user_agent: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

impl RequestInfo {
    pub fn from_request(req: &Request) -> Self {
        let headers = req.headers();

        Self {
            method: req.method().to_string(),
            uri: req.uri().to_string(),
            remote_addr: req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0),
            user_agent: headers
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string()),
            content_type: headers
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string()),
            content_length: headers
                .get("content-length")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok()),
        }
    }
}

/// Main middleware for request logs
///
/// Captures each request and response and logs them at a level chosen by the
/// response status class.
pub async fn request_logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();

    let request_info = RequestInfo::from_request(&req);
    let method = request_info.method.clone();
    let uri = request_info.uri.clone();

    debug!(
        method = %method,
        uri = %uri,
        remote_addr = ?request_info.remote_addr,
        user_agent = ?request_info.user_agent,
        "Incoming request"
    );

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status();

    match status.as_u16() {
        200..=299 => {
            info!(
                method = %method,
                uri = %uri,
                status = %status.as_u16(),
                duration_ms = %duration.as_millis(),
                remote_addr = ?request_info.remote_addr,
                content_type = ?request_info.content_type,
                content_length = ?request_info.content_length,
                "Request completed successfully"
            );
        }
        300..=399 => {
            info!(
                method = %method,
                uri = %uri,
                status = %status.as_u16(),
                duration_ms = %duration.as_millis(),
                remote_addr = ?request_info.remote_addr,
                "Request redirected"
            );
        }
        // client errors are not our fault, but worth a look
        400..=499 => {
            tracing::warn!(
                method = %method,
                uri = %uri,
                status = %status.as_u16(),
                duration_ms = %duration.as_millis(),
                remote_addr = ?request_info.remote_addr,
                user_agent = ?request_info.user_agent,
                "Client error"
            );
        }
        500..=599 => {
            error!(
                method = %method,
                uri = %uri,
                status = %status.as_u16(),
                duration_ms = %duration.as_millis(),
                remote_addr = ?request_info.remote_addr,
                user_agent = ?request_info.user_agent,
                content_type = ?request_info.content_type,
                "Server error occurred"
            );
        }
        _ => {
            debug!(
                method = %method,
                uri = %uri,
                status = %status.as_u16(),
                duration_ms = %duration.as_millis(),
                "Request completed with unusual status"
            );
        }
    }

    response
}

/// Config log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Debug,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(LogLevel::Info),
            "debug" | "trace" => Ok(LogLevel::Debug),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" | "critical" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level `{}`", other)),
        }
    }
}

impl LogLevel {
    pub fn to_tracing_level(&self) -> Level {
        match self {
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    pub fn to_filter_string(&self) -> String {
        let level = match self {
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        format!("sitecraft={level},tower_http={level}")
    }
}

/// Initialize logging system with specified level. `RUST_LOG` wins when set.
pub fn init_logging(log_level: LogLevel) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_string()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .pretty(),
        )
        .init();

    info!("Logging initialized with level: {:?}", log_level);
}
