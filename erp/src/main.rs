use chrono::Duration;
use clap::{Parser, command};
use dotenvy::dotenv;
use erp_database::ErpDatabase;
use tracing_subscriber::EnvFilter;

use crate::{
    config::Config,
    server::{App, AppState},
};

pub mod auth;
pub mod common;
pub mod config;
pub mod handlers;
pub mod reports;
pub mod server;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Server address
    #[arg(long, env = "ERP_SERVER_ADDRESS", default_value = "0.0.0.0:8080")]
    address: String,

    #[arg(long, env = "ERP_DATABASE_URL")]
    database_url: String,

    #[arg(long, env = "ERP_DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    max_connections: u32,

    /// Session lifetime, refreshed once less than half of it is left
    #[arg(long, env = "ERP_SESSION_TTL_MINUTES", default_value_t = 480)]
    session_ttl_minutes: i64,

    #[arg(long, env = "ERP_RESET_CODE_TTL_MINUTES", default_value_t = 30)]
    reset_code_ttl_minutes: i64,

    /// Marks the session cookie `Secure`; enable behind HTTPS
    #[arg(long, env = "ERP_COOKIE_SECURE", default_value_t = false)]
    cookie_secure: bool,

    /// Mileage reimbursement, in cents per kilometre
    #[arg(long, env = "ERP_MILEAGE_RATE_CENTS", default_value_t = 90)]
    mileage_rate_cents: i32,

    #[arg(long, env = "ERP_REPORT_ROWS_PER_PAGE", default_value_t = 40)]
    report_rows_per_page: usize,

    #[arg(long, env = "ERP_RUN_MIGRATIONS", default_value_t = false)]
    run_migrations: bool,
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        Config {
            session_ttl: Duration::minutes(args.session_ttl_minutes.max(1)),
            reset_code_ttl: Duration::minutes(args.reset_code_ttl_minutes.max(1)),
            cookie_secure: args.cookie_secure,
            mileage_rate_cents_per_km: args.mileage_rate_cents.max(0),
            report_rows_per_page: args.report_rows_per_page.max(1),
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::from(&args);

    let pool = ErpDatabase::connect(&args.database_url, args.max_connections)
        .await
        .expect("Could not connect with database");

    if args.run_migrations {
        ErpDatabase::migrate(&pool)
            .await
            .expect("Could not run database migrations");
        tracing::info!("Migrations applied");
    }

    let app = App::new(AppState::new(pool, config));

    match tokio::net::TcpListener::bind(&args.address).await {
        Ok(listener) => {
            tracing::info!("ERP server running at http://{}", args.address);
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Error starting ERP server: {:?}", e);
            }
        }
        Err(e) => {
            tracing::error!("Error binding server to the address: {:?}", e);
        }
    };
}
