use clap::Parser;
use resogate::db::mssql::MssqlGateway;
use resogate::resource::ListingKeyCache;
use resogate::server::{create_router, AppState};
use resogate::token::{spawn_sweeper, PgTokenStore, TokenStore};
use resogate::Config;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "resogate")]
#[command(about = "RESO Web API gateway for MLS listing data", long_about = None)]
struct Args {
    /// Port to listen on (overrides the PORT environment variable)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resogate=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env()?;
    if let Some(port) = args.port {
        config.port = port;
    }
    let config = Arc::new(config);

    // OAuth token store (PostgreSQL)
    let store = PgTokenStore::connect(&config.pg_connection_string).await?;
    store.init().await?;
    let tokens: Arc<dyn TokenStore> = Arc::new(store);
    tracing::info!("token store ready");

    // Backend gateway; connects lazily on first query
    let gateway = Arc::new(MssqlGateway::new(
        config.mssql.clone(),
        Duration::from_secs(config.db_request_timeout_secs),
    ));

    let sweeper = spawn_sweeper(tokens.clone());

    let state = AppState {
        gateway,
        tokens: tokens.clone(),
        config: config.clone(),
        listing_keys: Arc::new(ListingKeyCache::new()),
    };
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tokens.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
