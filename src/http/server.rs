//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with a single dispatching fallback
//! - Wire up middleware (request ID, tracing, timeout)
//! - Dispatch requests through the currently published router
//! - Rebuild and swap the router when the config file changes
//! - Observability (metrics, correlation IDs)

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ResponseConfig, RouterConfig};
use crate::http::endpoint::{build_router, redirect_target, render_body};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::routing::{BuildError, RouteContext, RouteValues, SharedRouter, SwapError, TreeRouter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<SharedRouter>,
}

/// HTTP server for the routing engine.
pub struct HttpServer {
    router: Router,
    config: RouterConfig,
    shared: Arc<SharedRouter>,
}

impl HttpServer {
    /// Build version 1 of the route table and the HTTP stack around it.
    pub fn new(config: RouterConfig) -> Result<Self, BuildError> {
        let table = build_router(&config, 1)?;
        Ok(Self::with_router(config, Arc::new(SharedRouter::new(table))))
    }

    pub fn with_router(config: RouterConfig, shared: Arc<SharedRouter>) -> Self {
        let state = AppState {
            router: Arc::clone(&shared),
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            shared,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RouterConfig, state: AppState) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.server.request_timeout_secs,
                    ))),
            )
    }

    /// The Axum router, for serving or for driving in tests.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    pub fn shared(&self) -> &Arc<SharedRouter> {
        &self.shared
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            version = self.shared.version(),
            "HTTP server starting"
        );

        let stop = Shutdown::wait(shutdown.subscribe());
        axum::serve(listener, self.router)
            .with_graceful_shutdown(stop)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// A config reload that could not be applied.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Swap(#[from] SwapError),
}

/// Rebuild the route table from `config` with the next version and publish it.
pub fn reload(shared: &SharedRouter, config: &RouterConfig) -> Result<u64, ReloadError> {
    let table = build_router(config, shared.next_version())?;
    let version = table.version();
    shared.swap(table)?;
    Ok(version)
}

/// Apply config updates until the channel closes or shutdown fires.
pub fn spawn_reloader(
    shared: Arc<SharedRouter>,
    mut updates: mpsc::UnboundedReceiver<RouterConfig>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                update = updates.recv() => {
                    let Some(config) = update else { break };
                    match reload(&shared, &config) {
                        Ok(version) => tracing::info!(version, routes = config.routes.len(), "Routes reloaded"),
                        Err(e) => tracing::error!(error = %e, "Reload rejected, keeping current routes"),
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
    })
}

/// Dispatch one request through the published router.
async fn dispatch_handler(State(state): State<AppState>, request: Request) -> Response {
    let start_time = Instant::now();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let method = request.method().clone();

    let router = state.router.load();
    let (parts, _body) = request.into_parts();
    let mut context = RouteContext::for_path(parts.uri.path());
    context.extensions.insert::<Method>(parts.method);
    context.extensions.insert::<HeaderMap>(parts.headers);

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %context.path().as_str(),
        version = router.version(),
        "Dispatching request"
    );

    let response = match router.route_request(&mut context).await {
        Ok(true) => respond(&router, &context, &request_id),
        Ok(false) => {
            tracing::debug!(request_id = %request_id, path = %context.path().as_str(), "No route matched");
            (StatusCode::NOT_FOUND, "No matching route found").into_response()
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Routing fault");
            (StatusCode::INTERNAL_SERVER_ERROR, "Routing failed").into_response()
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start_time);
    response
}

fn respond(router: &TreeRouter, context: &RouteContext, request_id: &str) -> Response {
    let endpoint = context.endpoint().unwrap_or_default();
    let Some(config) = context.extensions.get::<Arc<ResponseConfig>>() else {
        return (StatusCode::OK, endpoint.to_string()).into_response();
    };

    match config.as_ref() {
        ResponseConfig::Content { status, body } => {
            let body = render_body(body, context.route_data.values());
            (status_code(*status), body).into_response()
        }
        ResponseConfig::Redirect {
            redirect_route,
            redirect_values,
            status,
        } => {
            let values: RouteValues = redirect_values.iter().collect();
            match redirect_target(router, context, redirect_route.as_deref(), &values) {
                Ok(Some(link)) => {
                    let location = link.to_url_string();
                    tracing::debug!(request_id = %request_id, endpoint = %endpoint, location = %location, "Redirecting");
                    (status_code(*status), [(header::LOCATION, location)]).into_response()
                }
                Ok(None) => {
                    tracing::error!(request_id = %request_id, endpoint = %endpoint, "Redirect target is not reachable");
                    (StatusCode::INTERNAL_SERVER_ERROR, "Redirect target unavailable").into_response()
                }
                Err(e) => {
                    tracing::error!(request_id = %request_id, endpoint = %endpoint, error = %e, "Link generation fault");
                    (StatusCode::INTERNAL_SERVER_ERROR, "Routing failed").into_response()
                }
            }
        }
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
