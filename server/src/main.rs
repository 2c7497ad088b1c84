//! Caravan HTTP server binary.

use caravan_core::stores::UserStore;
use caravan_core::types::{Designation, User};
use caravan_core::Error;
use caravan_postgres::PostgresStores;
use caravan_server::session::hash_password;
use caravan_server::{build_router, AppState, Config};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "caravan=info,caravan_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Caravan HTTP server");

    let config = Config::from_env();
    info!(
        host = %config.server.host,
        port = config.server.port,
        batch_threshold = config.pipeline.batch_threshold,
        "Configuration loaded"
    );

    info!("Connecting to database...");
    let stores = PostgresStores::connect(&config.database.url).await?;
    stores.migrate().await?;
    info!("Database ready");

    if let Some(admin) = &config.bootstrap_admin {
        let user = User {
            username: admin.username.clone(),
            password_hash: hash_password(&admin.password),
            designation: Designation::Admin,
        };
        match stores.create_user(&user).await {
            Ok(created) => info!(username = %created.username, "bootstrap admin created"),
            Err(Error::Duplicate(_)) => {
                info!(username = %admin.username, "bootstrap admin already exists");
            }
            Err(other) => return Err(other.into()),
        }
    }

    let state = AppState::new(stores, config.pipeline.batch_threshold);
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Graceful shutdown on Ctrl+C (SIGINT) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
