use passage_auth::{InMemoryUserRepository, UserRepository};
use passage_server::{
    app,
    auth::{AppState, db::PgUserRepository},
    config::ServerConfig,
    error::ServerError,
};
use sqlx::postgres::PgPoolOptions;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "server stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), ServerError> {
    // Load configuration from environment
    let config = ServerConfig::from_env().map_err(|e| ServerError::configuration(e.to_string()))?;
    config.validate()?;
    tracing::info!(environment = ?config.environment, "Loaded configuration");

    let users: Arc<dyn UserRepository> = match &config.database_url {
        Some(database_url) => {
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await
                .map_err(ServerError::database)?;

            tracing::info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&db_pool)
                .await
                .map_err(ServerError::database)?;

            Arc::new(PgUserRepository::new(db_pool))
        }
        None => {
            tracing::warn!("database_url not set, users are kept in memory");
            Arc::new(InMemoryUserRepository::new())
        }
    };

    let state = Arc::new(AppState::from_config(&config, users)?);
    let router = app::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .map_err(ServerError::io)?;

    tracing::info!("listening on http://{}", config.bind_address);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::io)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
