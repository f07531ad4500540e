use anyhow::Context;
use clap::{Parser, Subcommand};
use sitecraft::Settings;
use sitecraft::domain::user::{Email, Password, Username};
use sitecraft::repository::sqlx_impl::PgUserRepository;
use sitecraft::services::jwt_service::JwtService;
use sitecraft::services::user_service::{CreateUserRequest, UserService};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Parser)]
#[clap(name = "sitecraft-cli", about = "Account administration for sitecraft")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account, optionally with the admin flag
    CreateUser {
        #[clap(long)]
        email: String,
        #[clap(long)]
        username: String,
        #[clap(long)]
        password: String,
        #[clap(long)]
        admin: bool,
    },
    /// Grant the admin flag
    Promote {
        #[clap(long)]
        username: String,
    },
    /// Revoke the admin flag
    Demote {
        #[clap(long)]
        username: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let settings = Settings::load().context("loading settings")?;

    let pool = PgPool::connect(&settings.database_url)
        .await
        .context("connecting to the database")?;
    sqlx::migrate!()
        .run(&pool)
        .await
        .context("running database migrations")?;

    let service = UserService::new(
        Arc::new(PgUserRepository::new(pool)),
        Arc::new(JwtService::new(&settings.secret_key)),
    );

    match cli.command {
        Commands::CreateUser {
            email,
            username,
            password,
            admin,
        } => {
            let req = CreateUserRequest {
                email: Email::try_from(email.as_str())?,
                username: Username::try_from(username.as_str())?,
                password: Password::try_from(password.as_str())?,
                is_admin: admin,
            };
            let user = service.create_user(req).await?;
            println!(
                "Created user {} ({}){}",
                user.user_id,
                user.username,
                if user.is_admin { " with admin rights" } else { "" }
            );
        }
        Commands::Promote { username } => {
            let user = service.set_admin(&username, true).await?;
            println!("{} is now an admin", user.username);
        }
        Commands::Demote { username } => {
            let user = service.set_admin(&username, false).await?;
            println!("{} is no longer an admin", user.username);
        }
    }

    Ok(())
}
