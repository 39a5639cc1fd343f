//! Plugin-extensible server bootstrap orchestrator.
//!
//! # Architecture Overview
//!
//! ```text
//!   Server::new(settings, plugin set)
//!        │
//!        ▼ ready()
//!   ┌───────────────────────── bootstrap pipeline ─────────────────────────┐
//!   │ config → transport → logging → pid → status → plugin_scan →          │
//!   │ plugin_enabled → plugin_version → config_seal → assets → plugin_init │
//!   └──────────────────────────────────────────────────────────────────────┘
//!        │                                   each stage mutates the shared
//!        ▼ listen()                          ServerState, strictly in order
//!   transport binds once, shutdown hooks registered, readiness emitted
//!        │
//!        ▼ close()
//!   shutdown callbacks run in reverse registration order, best effort
//! ```
//!
//! `inject` dispatches synthetic requests through the router in-process,
//! booting on demand, without ever binding a socket — the surface test
//! harnesses build on.

// Core subsystems
pub mod bootstrap;
pub mod config;
pub mod plugins;
pub mod server;
pub mod transport;

// Cross-cutting concerns
pub mod assets;
pub mod lifecycle;
pub mod observability;
pub mod shutdown;

pub use config::{ChassisConfig, Settings};
pub use plugins::PluginSet;
pub use server::{Phase, Server, ServerError, ServerState};
pub use shutdown::ShutdownCoordinator;
pub use transport::{HttpTransport, TransportInfo};
