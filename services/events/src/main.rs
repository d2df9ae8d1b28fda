use sea_orm::Database;
use tokio::sync::watch;
use tracing::{error, info};

use herald_core::config::Config;
use herald_core::tracing::init_tracing;
use herald_events::config::EventsConfig;
use herald_events::domain::types::TAIL_BLOCK_TIMEOUT;
use herald_events::infra::stream::connect_pool;
use herald_events::relay::OutboxRelay;
use herald_events::router::build_router;
use herald_events::state::AppState;

#[tokio::main]
async fn main() {
    let config = EventsConfig::from_env();
    init_tracing(config.log_format);

    let relay_settings = match config.relay_settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e.report(), "invalid relay configuration");
            std::process::exit(1);
        }
    };

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let redis =
        connect_pool(&config.redis_url, TAIL_BLOCK_TIMEOUT).expect("failed to create Redis pool");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = AppState::new(db, redis, shutdown_rx.clone());

    // Outbox relay
    let relay = OutboxRelay::new(state.outbox_repo(), state.stream_log(), relay_settings);
    let relay_task = tokio::spawn(async move { relay.run(shutdown_rx).await });

    // HTTP server
    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.events_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("events service listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await
        .expect("server error");

    if let Err(e) = relay_task.await {
        error!(error = %e, "outbox relay task panicked");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
