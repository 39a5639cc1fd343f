//! HTTP transport.
//!
//! # Responsibilities
//! - Hold the route table while bootstrap stages and plugins register routes
//! - Bind the listener exactly once and serve with graceful shutdown
//! - Dispatch synthetic requests in-process for `inject`
//! - Report the bound address after start
//!
//! # Design Decisions
//! - Routes stay unbound until `start`; `inject` never touches a socket
//! - Middleware (trace, request id) wraps the route snapshot at dispatch
//!   time so plugin routes are covered too
//! - `start` is guarded by a once-cell: repeat calls observe the first bind

use std::net::SocketAddr;
use std::sync::Mutex;

use axum::body::Body;
use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::MethodRouter;
use axum::Router;
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{watch, OnceCell};
use tokio::task::JoinHandle;
use tower::ServiceExt;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Errors raised by the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Route registration attempted after the listener started.
    #[error("transport already started")]
    AlreadyStarted,

    /// Lifecycle operation attempted before the transport stage ran.
    #[error("transport has not been constructed")]
    NotConstructed,

    #[error("transport serve task failed: {0}")]
    Serve(String),
}

/// Bound-address information, available after `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransportInfo {
    pub addr: SocketAddr,
}

/// The network-facing request listener and router.
pub struct HttpTransport {
    bind_addr: SocketAddr,
    routes: Mutex<Router>,
    started: OnceCell<TransportInfo>,
    shutdown: watch::Sender<bool>,
    serve_task: Mutex<Option<JoinHandle<Result<(), std::io::Error>>>>,
}

impl HttpTransport {
    /// Create an unbound transport for the given address.
    pub fn new(bind_addr: SocketAddr) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            bind_addr,
            routes: Mutex::new(Router::new()),
            started: OnceCell::new(),
            shutdown,
            serve_task: Mutex::new(None),
        }
    }

    /// Register a route. Valid only before `start`.
    pub fn route(&self, path: &str, handler: MethodRouter) -> Result<(), TransportError> {
        if self.started.get().is_some() {
            return Err(TransportError::AlreadyStarted);
        }
        let mut routes = self.lock_routes();
        *routes = std::mem::take(&mut *routes).route(path, handler);
        Ok(())
    }

    /// Nest a whole service under a path prefix. Valid only before `start`.
    pub fn nest_service<S>(&self, path: &str, service: S) -> Result<(), TransportError>
    where
        S: tower::Service<Request, Error = std::convert::Infallible>
            + Clone
            + Send
            + Sync
            + 'static,
        S::Response: axum::response::IntoResponse,
        S::Future: Send + 'static,
    {
        if self.started.get().is_some() {
            return Err(TransportError::AlreadyStarted);
        }
        let mut routes = self.lock_routes();
        *routes = std::mem::take(&mut *routes).nest_service(path, service);
        Ok(())
    }

    /// Bind the listener and start serving. Idempotent: the first bind wins
    /// and repeat calls return the same info.
    pub async fn start(&self) -> Result<TransportInfo, TransportError> {
        self.started
            .get_or_try_init(|| async {
                let listener =
                    TcpListener::bind(self.bind_addr)
                        .await
                        .map_err(|source| TransportError::Bind {
                            addr: self.bind_addr,
                            source,
                        })?;
                let addr = listener.local_addr().map_err(|source| TransportError::Bind {
                    addr: self.bind_addr,
                    source,
                })?;

                let app = self.service();
                let mut shutdown_rx = self.shutdown.subscribe();
                let task = tokio::spawn(async move {
                    axum::serve(listener, app.into_make_service())
                        .with_graceful_shutdown(async move {
                            let _ = shutdown_rx.wait_for(|stop| *stop).await;
                        })
                        .await
                });
                *self.lock_serve_task() = Some(task);

                tracing::info!(address = %addr, "transport listening");
                Ok(TransportInfo { addr })
            })
            .await
            .copied()
    }

    /// Stop accepting connections and wait for in-flight requests to drain.
    pub async fn stop(&self) -> Result<(), TransportError> {
        let _ = self.shutdown.send(true);
        let task = self.lock_serve_task().take();
        if let Some(task) = task {
            task.await
                .map_err(|e| TransportError::Serve(e.to_string()))?
                .map_err(|e| TransportError::Serve(e.to_string()))?;
            tracing::info!("transport drained");
        }
        Ok(())
    }

    /// Dispatch a synthetic request through the router without the network.
    pub async fn inject(&self, request: Request<Body>) -> Result<Response, TransportError> {
        let app = self.service();
        match app.oneshot(request).await {
            Ok(response) => Ok(response),
            Err(never) => match never {},
        }
    }

    /// Bound-address info, if `start` has completed.
    pub fn info(&self) -> Option<TransportInfo> {
        self.started.get().copied()
    }

    /// Snapshot of the route table with base middleware applied.
    fn service(&self) -> Router {
        self.lock_routes()
            .clone()
            .layer(middleware::from_fn(request_id))
            .layer(TraceLayer::new_for_http())
    }

    fn lock_routes(&self) -> std::sync::MutexGuard<'_, Router> {
        self.routes.lock().expect("route table mutex poisoned")
    }

    fn lock_serve_task(
        &self,
    ) -> std::sync::MutexGuard<'_, Option<JoinHandle<Result<(), std::io::Error>>>> {
        self.serve_task.lock().expect("serve task mutex poisoned")
    }
}

/// Attach a request id to the request and echo it on the response.
async fn request_id(mut request: Request, next: Next) -> Response {
    let id = Uuid::new_v4().to_string();
    if let Ok(value) = HeaderValue::from_str(&id) {
        request.headers_mut().insert("x-request-id", value.clone());
        let mut response = next.run(request).await;
        response.headers_mut().insert("x-request-id", value);
        return response;
    }
    next.run(request).await
}
