//! REST server.
//!
//! One [`ModelHandle`] is opened at startup and shared by every handler
//! through axum state. The server comes up even when the model fails to
//! load; `/health` then reports `unhealthy` until `/admin/reload` succeeds.

mod error;
mod handlers;
mod state;

pub(crate) use state::AppState;

use abode::ServiceConfig;
use abode_model::ModelHandle;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tokio::net::TcpListener;

/// Largest accepted request body, sized for CSV uploads.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Build the application router.
pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(handlers::predict))
        .route("/predict/batch", post(handlers::predict_batch))
        .route("/health", get(handlers::health))
        .route("/model_metadata_info", get(handlers::model_metadata_info))
        .route("/model_info", get(handlers::model_info))
        .route("/options", get(handlers::options))
        .route("/download-sample", get(handlers::download_sample))
        .route("/admin/reload", post(handlers::reload))
        .route("/favicon.ico", get(handlers::favicon))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Load the model and serve until Ctrl-C.
pub(crate) async fn serve(config: &ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let paths = config.model_paths();
    let options = config.load_options()?;
    tracing::info!(
        model = %paths.model.display(),
        metadata = %paths.metadata.display(),
        "loading model"
    );
    let handle = tokio::task::spawn_blocking(move || ModelHandle::open(paths, options)).await?;

    match handle.current() {
        Some(model) => tracing::info!(
            name = %model.metadata().model_info.name,
            val_r2 = model.metadata().performance.val_r2,
            "model ready"
        ),
        None => tracing::warn!("starting without a model; /health will report unhealthy"),
    }

    let app = router(AppState::new(handle));
    let listener = TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
