use clap::Parser;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use companion_hub::db::schema::ensure_schema;
use companion_hub::routing::RouteTable;
use companion_hub::server::config::ServerConfig;
use companion_hub::services::{LocalAuthProvider, WebhookMailer};
use companion_hub::store::SeaOrmCatalogStore;
use companion_hub::version::VERSION;
use companion_hub::web::{AppState, create_axum_router};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "server.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal.");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Manually check for --version before full parsing to keep the simple output.
    if std::env::args().any(|arg| arg == "--version") {
        println!("Server version: {VERSION}");
        return Ok(());
    }

    let args = Args::parse();
    let server_config = Arc::new(ServerConfig::load(args.config.as_deref())?);

    init_logging(&server_config.log_dir);
    info!("Starting server, version: {}", VERSION);

    // --- Database Pool Setup ---
    let mut opt = ConnectOptions::new(server_config.database_url.to_owned());
    opt.max_connections(10).sqlx_logging(false);
    let db_pool: DatabaseConnection = match Database::connect(opt).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "Failed to create database connection.");
            return Err(e.into());
        }
    };
    ensure_schema(&db_pool).await?;

    // --- Services ---
    let mailer = Arc::new(WebhookMailer::new(&server_config.password_reset));
    let auth = Arc::new(LocalAuthProvider::new(db_pool.clone(), server_config.clone(), mailer));
    let store = Arc::new(SeaOrmCatalogStore::new(db_pool));

    let app = create_axum_router(AppState {
        store,
        auth,
        routes: Arc::new(RouteTable::standard()),
        config: server_config.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&server_config.listen_addr).await?;
    info!("HTTP server listening on {}", server_config.listen_addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}
