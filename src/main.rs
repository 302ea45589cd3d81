use std::time::Duration;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use corkboard::app::notifier::{NotificationChannels, Notifier};
use corkboard::config::AppConfig;
use corkboard::http;
use corkboard::infra::{db::Db, queue::JobQueue};
use corkboard::jobs::{scheduler::Scheduler, worker};
use corkboard::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let db = Db::connect(&config).await?;
    let channels = NotificationChannels::from_config(&config)?;

    let (jobs, job_rx) = JobQueue::new();
    let notifier = Notifier::new(db.clone(), channels);
    let worker_handle = tokio::spawn(worker::run(db.clone(), notifier, job_rx));

    let scheduler = Scheduler::new(
        db.clone(),
        Duration::from_secs(config.sweep_interval_seconds),
        Duration::from_secs(config.sweep_retry_seconds),
    );
    scheduler.start().await;

    let state = AppState {
        db,
        jobs,
        paseto_key: config.paseto_key,
        token_ttl_minutes: config.token_ttl_minutes,
        make_admin_enabled: config.make_admin_enabled,
    };

    let app: Router = http::router(state).layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    tracing::info!("listening on {}", config.http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router (and with it the queue sender) is gone; the worker drains
    // whatever is left, the scheduler is told to stop.
    scheduler.stop().await?;
    let _ = tokio::time::timeout(Duration::from_secs(5), worker_handle).await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
