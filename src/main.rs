use std::sync::Arc;

use app_database::AppDatabase;
use axum::{
    routing::{get, post},
    Extension, Router,
};
use clap::Parser;
use scan_stats::ScanStatsClient;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app_database;
mod models;
mod routes;
mod scan_stats;
mod schema;
mod validation;
mod views;

pub struct Config {
    pub pool_fee: f64,
    pub reward_system: String,
    pub stats_enabled: bool,
}

#[derive(Parser, Debug)]
#[command(version, author, about, long_about = None)]
struct Args {
    #[arg(
        long,
        value_name = "port",
        help = "Port to listen on for the pool api",
        default_value = "8000",
        global = true
    )]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let file_appender = tracing_appender::rolling::daily("./logs", "server.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chia_pool_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    // load envs
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set.");
    let pool_fee = std::env::var("POOL_FEE")
        .ok()
        .and_then(|fee| fee.parse::<f64>().ok())
        .unwrap_or(0.01);
    let reward_system =
        std::env::var("REWARD_SYSTEM").unwrap_or_else(|_| "PPLNS".to_string());
    let stats_enabled = std::env::var("STATS_ENABLED")
        .map(|enabled| enabled != "false")
        .unwrap_or(true);
    let scan_stats_url = std::env::var("SCAN_STATS_URL").ok();

    let app_database = Arc::new(AppDatabase::new(database_url));

    println!("Validating database connection");
    match app_database.get_total_points().await {
        Ok(total_points) => {
            tracing::info!(target: "server_log", "Database connection ok. Total pool points: {}", total_points);
        }
        Err(_) => {
            panic!("Failed to query launchers from database");
        }
    }

    let config = Arc::new(Config {
        pool_fee,
        reward_system,
        stats_enabled,
    });

    let scan_stats_client = Arc::new(scan_stats_url.map(ScanStatsClient::new));

    let app = Router::new()
        .route("/launcher", get(routes::get_launchers))
        .route(
            "/launcher/{launcher_id}",
            get(routes::get_launcher).put(routes::update_launcher),
        )
        .route("/blocks", get(routes::get_blocks))
        .route("/partials", get(routes::get_partials))
        .route("/payouts", get(routes::get_payouts))
        .route("/payoutaddresses", get(routes::get_payout_addresses))
        .route("/transactions", get(routes::get_transactions))
        .route("/stats", get(routes::get_stats))
        .route("/space", get(routes::get_space))
        .route("/timeseries", get(routes::get_timeseries))
        .route("/login", post(routes::post_login))
        .route("/login_qr", post(routes::post_login_qr))
        .route("/scan_stats", get(routes::get_scan_stats))
        .layer(Extension(app_database))
        .layer(Extension(config))
        .layer(Extension(scan_stats_client))
        .layer(CorsLayer::permissive())
        // Logging
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        );

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port)).await?;

    tracing::info!(target: "server_log", "listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
