use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tera::Tera;
use tokio::net::TcpListener;

use sitecraft::api::health::{SharedProbe, init_health_check};
use sitecraft::handler::logging::init_logging;
use sitecraft::repository::sqlx_impl::{PgJobRepository, PgPostRepository, PgUserRepository};
use sitecraft::{AppServices, Settings, build_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load().context("loading settings")?;
    init_logging(settings.log_level());
    init_health_check();

    if settings.uses_default_secret() {
        tracing::warn!("SECRET_KEY is not set; using the development default");
    }

    // Database
    let pool = PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .connect(&settings.database_url)
        .await
        .context("connecting to the database")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("running database migrations")?;

    tokio::fs::create_dir_all(&settings.upload_dir)
        .await
        .with_context(|| format!("creating {}", settings.upload_dir.display()))?;

    let services = AppServices::new(
        &settings,
        Arc::new(PgUserRepository::new(pool.clone())),
        Arc::new(PgPostRepository::new(pool.clone())),
        Arc::new(PgJobRepository::new(pool.clone())),
        Arc::new(pool) as SharedProbe,
    );

    let tera = Tera::new(&settings.templates_glob).context("loading templates")?;

    let addr = settings.bind_addr();
    let app = build_app(Arc::new(settings), tera, services);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!("sitecraft listening on http://{}", addr);
    tracing::info!("  • Health: /api/health, /api/health/ready, /api/health/live");
    tracing::info!("  • Public: /, /about, /services, /careers, /blog, /login, /register");
    tracing::info!("  • Members: /for-clients, /for-hire, /contact, /create_post");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
