pub mod error;
pub mod proxy;
pub mod rewriting;
pub mod state;

use std::{future::Future, sync::Arc};

use axum::{
    http::HeaderValue,
    routing::{options, MethodRouter},
    Router,
};
use error::Result;
use hyper::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use proxy::service::{preflight, proxy};
use scorched::{logf, LogData, LogImportance};
use state::{Config, ProxyState};
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;

pub use error::AppError;

/// Routes for everything under `/proxy`. Every response, errors and preflights included,
/// carries the same permissive cross-origin headers.
pub fn router(state: Arc<ProxyState>) -> Router {
    let proxy_route: MethodRouter<Arc<ProxyState>> = options(preflight).fallback(proxy);

    let cors = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization"),
        ));

    Router::new()
        .route("/proxy", proxy_route.clone())
        .route("/proxy/", proxy_route.clone())
        .route("/proxy/*path", proxy_route)
        .layer(cors)
        .with_state(state)
}

pub async fn serve<F>(config: Arc<Config>, graceful_shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = Arc::new(ProxyState::new(&config)?);

    logf!(Info, "Forwarding /proxy to {}", state.fetcher.origin());

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.host).await?;

    logf!(Info, "Server running on {}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(graceful_shutdown)
        .await?;

    Ok(())
}
