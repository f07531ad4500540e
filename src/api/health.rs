use async_trait::async_trait;
use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde::Serialize;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

/// Something that can tell whether the database answers.
#[async_trait]
pub trait DatabaseProbe: Send + Sync + 'static {
    /// Number of active connections on success.
    async fn ping(&self) -> anyhow::Result<i64>;
}

#[async_trait]
impl DatabaseProbe for PgPool {
    async fn ping(&self) -> anyhow::Result<i64> {
        let row = sqlx::query(
            "SELECT count(*) AS connection_count FROM pg_stat_activity WHERE state = 'active'",
        )
        .fetch_one(self)
        .await?;
        Ok(row.try_get("connection_count").unwrap_or(0))
    }
}

pub type SharedProbe = Arc<dyn DatabaseProbe>;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub database: DatabaseHealth,
    pub services: ServicesHealth,
}

#[derive(Serialize)]
pub struct DatabaseHealth {
    pub status: String,
    pub response_time_ms: Option<u64>,
    pub active_connections: Option<i64>,
}

#[derive(Serialize)]
pub struct ServicesHealth {
    pub jwt_service: String,
    pub password_hashing: String,
}

static START_TIME: std::sync::OnceLock<SystemTime> = std::sync::OnceLock::new();

pub fn init_health_check() {
    START_TIME.set(SystemTime::now()).ok();
}

// GET /api/health
pub async fn health_check(Extension(probe): Extension<SharedProbe>) -> impl IntoResponse {
    let start_time = START_TIME.get().copied().unwrap_or_else(SystemTime::now);
    let uptime = SystemTime::now()
        .duration_since(start_time)
        .unwrap_or_default()
        .as_secs();

    let db_health = check_database_health(probe.as_ref()).await;
    let services_health = check_services_health();

    let overall_status = if db_health.status == "healthy"
        && services_health.jwt_service == "healthy"
        && services_health.password_hashing == "healthy"
    {
        "healthy"
    } else {
        "unhealthy"
    };

    let response = HealthResponse {
        status: overall_status.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        database: db_health,
        services: services_health,
    };

    let status_code = if overall_status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}

// GET /api/health/ready
pub async fn readiness_check(Extension(probe): Extension<SharedProbe>) -> impl IntoResponse {
    match probe.ping().await {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "timestamp": Utc::now().to_rfc3339()
            })),
        ),
        Err(e) => {
            tracing::warn!("Readiness probe failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "not_ready",
                    "timestamp": Utc::now().to_rfc3339(),
                    "error": "database_connection_failed"
                })),
            )
        }
    }
}

// GET /api/health/live
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "alive",
            "timestamp": Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

async fn check_database_health(probe: &dyn DatabaseProbe) -> DatabaseHealth {
    let start = Instant::now();
    let result = probe.ping().await;
    let response_time = start.elapsed().as_millis() as u64;

    match result {
        Ok(connections) => DatabaseHealth {
            status: "healthy".to_string(),
            response_time_ms: Some(response_time),
            active_connections: Some(connections),
        },
        Err(_) => DatabaseHealth {
            status: "unhealthy".to_string(),
            response_time_ms: Some(response_time),
            active_connections: None,
        },
    }
}

fn check_services_health() -> ServicesHealth {
    let status = |ok: bool| if ok { "healthy" } else { "unhealthy" }.to_string();

    ServicesHealth {
        jwt_service: status(session_tokens_work().is_ok()),
        password_hashing: status(password_hashing_works().is_ok()),
    }
}

pub fn session_tokens_work() -> anyhow::Result<()> {
    use crate::services::jwt_service::JwtService;

    let jwt_service = JwtService::new("health_check_secret");
    let token = jwt_service.generate_token(1, "health", false)?;
    jwt_service.verify_token(&token)?;
    Ok(())
}

pub fn password_hashing_works() -> anyhow::Result<()> {
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString},
    };
    use password_hash::{PasswordHash, PasswordVerifier};
    use rand::thread_rng;

    let password = "test_password";
    let salt = SaltString::generate(thread_rng());
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hash error: {}", e))?
        .to_string();
    let parsed_hash = PasswordHash::new(&hash)
        .map_err(|e| anyhow::anyhow!("password hash parse error: {}", e))?;
    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|e| anyhow::anyhow!("password verify error: {}", e))?;

    Ok(())
}
