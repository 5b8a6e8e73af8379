pub mod handlers;
pub mod state;

use crate::config::Config;
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    response::Response,
    routing::get,
};
use state::{AppState, BuildError};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Build the application router for `config`.
pub async fn build_router(config: Config) -> Result<Router, BuildError> {
    let state = AppState::new(config).await?;
    Ok(router(state))
}

/// Router over an already constructed state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::health_check))
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::serve_metrics))
        .route("/movies/{id}", get(handlers::movies::get_movie))
        .route("/trending/{window}", get(handlers::lists::trending))
        .route("/discover", get(handlers::lists::discover))
        .layer(CorsLayer::permissive())
        .layer(middleware::map_response(version_header))
        .with_state(state)
}

async fn version_header(mut response: Response) -> Response {
    response.headers_mut().insert(
        "x-cinecache-version",
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );
    response
}

/// Start the Axum HTTP server and run until `shutdown` is cancelled.
pub async fn start(config: Config, shutdown: CancellationToken) -> Result<(), BuildError> {
    let addr = format!("0.0.0.0:{}", config.port);
    let app = build_router(config).await?;

    let listener = match tokio::net::TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    info!("🎬 Server listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
    {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Server stopped");
    Ok(())
}
