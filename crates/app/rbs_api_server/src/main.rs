//! RBS storefront auth API server binary.
//!
//! `rbs_api_server` serves the HTTP API; `rbs_api_server create-user` seeds an
//! account (the storefront has no self-service registration here).

use std::sync::Arc;

use clap::{Parser, Subcommand};
use rbs_api::config::ApiConfig;
use rbs_core::auth::accounts::create_account;
use rbs_core::clock::SystemClock;
use rbs_core::mail::{HttpMailer, Mailer};
use rbs_core::store::PgStore;
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "rbs_api_server", about = "RBS storefront auth API server")]
struct Args {
    /// Address to listen on. Overrides `BIND_ADDR`.
    #[arg(long)]
    bind: Option<String>,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/rbs"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a user account and exit.
    CreateUser {
        #[arg(long)]
        email: String,

        #[arg(long)]
        name: String,

        #[arg(long, env = "RBS_USER_PASSWORD")]
        password: String,

        /// Grant the admin role.
        #[arg(long, default_value_t = false)]
        admin: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,rbs_api=debug,rbs_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let pool = rbs_core::db::connect(&args.database_url, args.max_connections).await?;

    info!("running database migrations");
    rbs_core::db::migrate(&pool).await?;

    let store = Arc::new(PgStore::new(pool));

    if let Some(Command::CreateUser {
        email,
        name,
        password,
        admin,
    }) = args.command
    {
        let user = create_account(store.as_ref(), &email, &name, &password, admin).await?;
        info!(user_id = %user.id, email = %user.email, admin, "user created");
        return Ok(());
    }

    let mut config = ApiConfig::from_env()?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    let mailer: Option<Arc<dyn Mailer>> = match config.mail.clone() {
        Some(mail) => Some(Arc::new(HttpMailer::new(mail))),
        None => {
            warn!("mail relay not configured; password reset requests will fail");
            None
        }
    };
    if config.google_oauth.is_none() {
        warn!("Google OAuth not configured; /auth/google/redirect will fail");
    }

    let bind_addr = config.bind_addr.clone();
    let state = rbs_api::AppState::new(config, store, mailer, Arc::new(SystemClock))?;
    let app = rbs_api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    Ok(())
}
