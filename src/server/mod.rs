//! Server lifecycle controller.
//!
//! # Data Flow
//! ```text
//! Server::new (settings + plugin set, nothing runs yet)
//!     → ready()  : one bootstrap pipeline run, shared by all callers
//!     → listen() : bind transport once, register drain, emit readiness
//!     → close()  : run shutdown callbacks in reverse, best effort
//!     → inject() : synthetic dispatch, boots on demand, never binds
//! ```
//!
//! # Design Decisions
//! - At most one bootstrap run regardless of caller concurrency: the
//!   outcome lives in a once-cell every `ready()` call awaits
//! - A failed bootstrap or listen pins the server in `Failed`; a fresh
//!   server is required for another attempt
//! - Auto-listen fires only on the call that actually ran the pipeline,
//!   so `listen()` awaiting `ready()` cannot recurse indefinitely

pub mod state;
pub mod status;

pub use state::ServerState;
pub use status::{StatusBody, StatusShared};

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::extract::Request;
use axum::response::Response;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::{Mutex, OnceCell};

use crate::bootstrap::{stages, BootstrapError, Pipeline};
use crate::config::Settings;
use crate::lifecycle::readiness;
use crate::plugins::PluginSet;
use crate::shutdown::{CleanupError, ShutdownError};
use crate::transport::{TransportError, TransportInfo};

/// Lifecycle phase of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Constructed,
    Booting,
    Ready,
    Listening,
    Closed,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Constructed => "constructed",
            Phase::Booting => "booting",
            Phase::Ready => "ready",
            Phase::Listening => "listening",
            Phase::Closed => "closed",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the lifecycle operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("server has already been closed")]
    Closed,

    #[error("server previously failed to start")]
    Failed,
}

struct Inner {
    state: Mutex<ServerState>,
    boot: OnceCell<Result<(), BootstrapError>>,
    boot_just_ran: AtomicBool,
    listening: OnceCell<TransportInfo>,
    phase: Arc<ArcSwap<Phase>>,
    capabilities: Arc<DashMap<String, serde_json::Value>>,
}

/// Handle to one server instance. Cheap to clone, safe to share.
#[derive(Clone)]
pub struct Server {
    inner: Arc<Inner>,
}

impl Server {
    /// Construct a server. Nothing runs until `ready`, `listen`, or
    /// `inject` is called.
    pub fn new(settings: Settings, plugins: PluginSet) -> Self {
        let state = ServerState::new(settings, plugins);
        let phase = Arc::clone(&state.status.phase);
        let capabilities = state.capabilities_handle();
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                boot: OnceCell::new(),
                boot_just_ran: AtomicBool::new(false),
                listening: OnceCell::new(),
                phase,
                capabilities,
            }),
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        **self.inner.phase.load()
    }

    fn set_phase(&self, phase: Phase) {
        self.inner.phase.store(Arc::new(phase));
    }

    /// Run the bootstrap pipeline, or wait for the run already in flight.
    ///
    /// Idempotent: the pipeline executes at most once per server, and
    /// every caller observes the same outcome. A failure is permanent.
    pub async fn ready(&self) -> Result<(), ServerError> {
        let outcome = self
            .inner
            .boot
            .get_or_init(|| async {
                self.set_phase(Phase::Booting);
                tracing::info!("starting bootstrap");
                let mut state = self.inner.state.lock().await;
                let pipeline = Pipeline::new(stages::default_stages());
                match pipeline.run(&mut state).await {
                    Ok(()) => {
                        self.inner.boot_just_ran.store(true, Ordering::SeqCst);
                        self.set_phase(Phase::Ready);
                        Ok(())
                    }
                    Err(error) => {
                        self.set_phase(Phase::Failed);
                        Err(error)
                    }
                }
            })
            .await
            .clone();
        outcome?;

        // Only the call that performed the run triggers auto-listen; the
        // nested ready() inside listen() then sees the flag cleared.
        if self.inner.boot_just_ran.swap(false, Ordering::SeqCst) {
            let auto_listen = {
                let state = self.inner.state.lock().await;
                state
                    .config()
                    .map(|c| c.server.auto_listen)
                    .unwrap_or(false)
            };
            if auto_listen {
                Box::pin(self.listen()).await?;
            }
        }
        Ok(())
    }

    /// Start accepting requests.
    ///
    /// Idempotent: the listener binds exactly once; repeat calls return
    /// the same transport info.
    pub async fn listen(&self) -> Result<TransportInfo, ServerError> {
        self.ready().await?;

        match self.phase() {
            Phase::Closed => return Err(ServerError::Closed),
            Phase::Failed => return Err(ServerError::Failed),
            _ => {}
        }

        let info = self
            .inner
            .listening
            .get_or_try_init(|| async {
                let transport = { self.inner.state.lock().await.transport()? };
                let info = transport.start().await?;

                {
                    let mut state = self.inner.state.lock().await;
                    let transport = Arc::clone(&transport);
                    state.shutdown.register("transport", move || async move {
                        transport
                            .stop()
                            .await
                            .map_err(|e| Box::new(e) as CleanupError)
                    });
                }

                self.set_phase(Phase::Listening);
                readiness::notify_listening(&info);
                Ok::<TransportInfo, ServerError>(info)
            })
            .await;

        match info {
            Ok(info) => Ok(*info),
            Err(error) => {
                self.set_phase(Phase::Failed);
                Err(error)
            }
        }
    }

    /// Stop the server: drain the transport (when listening) and run all
    /// shutdown callbacks in reverse registration order.
    ///
    /// Calling `close` on an already-closed server is a no-op.
    pub async fn close(&self) -> Result<(), ShutdownError> {
        if self.phase() == Phase::Closed {
            return Ok(());
        }
        tracing::info!("closing server");
        let result = {
            let mut state = self.inner.state.lock().await;
            state.shutdown.run_all().await
        };
        self.set_phase(Phase::Closed);
        result
    }

    /// Dispatch a synthetic request without binding a network socket.
    ///
    /// Boots the server on demand; `listen` is never required.
    pub async fn inject(&self, request: Request<Body>) -> Result<Response, ServerError> {
        self.ready().await?;
        let transport = { self.inner.state.lock().await.transport()? };
        Ok(transport.inject(request).await?)
    }

    /// Bound transport info, when listening.
    pub fn info(&self) -> Option<TransportInfo> {
        self.inner.listening.get().copied()
    }

    /// Look up a capability registered by a plugin during bootstrap.
    pub fn capability(&self, name: &str) -> Option<serde_json::Value> {
        self.inner.capabilities.get(name).map(|v| v.value().clone())
    }
}
