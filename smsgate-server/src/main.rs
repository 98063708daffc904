use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;

use smsgate_server::account::MemoryDirectory;
use smsgate_server::config::Config;
use smsgate_server::metrics::Metrics;
use smsgate_server::routes::{self, AppState};
use smsgate_server::sms::stoplist::StopList;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration from environment variables and CLI arguments
    let config = Config::from_env_and_args()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("smsgate={}", config.log_level).parse()?),
        )
        .init();

    let accounts = match &config.accounts {
        Some(path) => MemoryDirectory::from_file(path)?,
        None => {
            tracing::warn!("no accounts file given, using built-in development accounts");
            MemoryDirectory::dev_directory()
        }
    };

    let state = AppState {
        accounts: Arc::new(accounts),
        stoplist: Arc::new(StopList::new(config.stop_ttl)),
        metrics: Arc::new(Metrics::new()),
    };

    let app = routes::router(state, &config)?;

    tracing::info!(
        "smsgate listening on {} ({} requests per {:?} window)",
        config.bind,
        config.request_limit,
        config.window
    );

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

/// Resolves when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let interrupt = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received, draining connections");
}
