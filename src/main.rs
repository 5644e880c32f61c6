use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use storeops_api::auth::{AuthConfig, AuthService};
use storeops_api::config::{init_tracing, load_config};
use storeops_api::db::{establish_connection_from_app_config, run_migrations};
use storeops_api::services::AppServices;
use storeops_api::storage::UploadService;
use storeops_api::{app_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;
    init_tracing(config.log_level(), config.log_json);
    info!(
        environment = %config.environment,
        "Starting storeops-api v{}",
        env!("CARGO_PKG_VERSION")
    );

    let db = Arc::new(
        establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to the database")?,
    );
    if config.auto_migrate {
        run_migrations(&db).await.context("migration failed")?;
        info!("Database migrations applied");
    }

    let uploads = Arc::new(UploadService::from_config(&config.storage)?);
    let auth = Arc::new(AuthService::new(AuthConfig {
        jwt_secret: config.jwt_secret.clone(),
        access_ttl_secs: config.jwt_expiration,
        refresh_ttl_secs: config.refresh_token_expiration,
    }));
    let services = AppServices::new(db.clone(), uploads);

    let state = AppState {
        db,
        config: Arc::new(config.clone()),
        auth,
        services,
    };
    let app = app_router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => warn!(error = %e, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl-c, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
