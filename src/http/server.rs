//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router for the dispatch endpoint and admin API
//! - Wire up middleware (request ID, tracing, timeout)
//! - Hand each dispatch request to the resolution engine
//! - Serve until the shutdown future resolves

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, Method, Request},
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::config::DispatchConfig;
use crate::engine::ResolutionEngine;
use crate::http::request::{request_id, MakeRequestUuid};
use crate::http::response::{error_response, handler_response, not_implemented};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ResolutionEngine>,
    /// Live configuration, replaced on hot reload.
    pub config: Arc<ArcSwap<DispatchConfig>>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(engine: Arc<ResolutionEngine>, config: Arc<ArcSwap<DispatchConfig>>) -> Self {
        Self {
            engine,
            config,
            started_at: Instant::now(),
        }
    }
}

/// HTTP front end for the resolution engine.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let router = Self::build_router(state);
        Self { router }
    }

    /// The fully layered router, for serving or for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let config = state.config.load_full();
        let prefix = config.listener.dispatch_prefix.trim_end_matches('/');

        let mut router = Router::new()
            .route(&format!("{prefix}/{{pattern}}"), any(dispatch_handler))
            .with_state(state.clone());

        if config.admin.enabled {
            router = router.merge(admin::setup_admin_router(state));
        }

        router
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id(request.headers()),
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Resolve `{pattern}` with the request's verb and invoke the handler.
async fn dispatch_handler(
    State(state): State<AppState>,
    Path(pattern): Path<String>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    let expose_details = state.config.load().listener.expose_error_details;

    tracing::debug!(
        request_id = %request_id(&headers),
        pattern = %pattern,
        verb = %method,
        "Dispatching"
    );

    match state.engine.resolve(&pattern, method.as_str()).await {
        Ok(resolution) => match resolution.handler.invoke(&resolution.target.method) {
            Some(value) => handler_response(value, resolution.cache_hit),
            None => not_implemented(&resolution.target.type_name, &resolution.target.method),
        },
        Err(e) => error_response(&e, expose_details),
    }
}
