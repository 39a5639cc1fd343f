//! The fixed stage sequence run by `Server::ready`.
//!
//! Order matters: configuration resolves first, the transport exists
//! before anything registers routes, plugins are discovered and narrowed
//! before the config seals, and plugin initialization runs last so every
//! plugin sees a fully prepared server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Json;
use tower_http::services::ServeDir;

use crate::assets;
use crate::bootstrap::{Stage, StageResult};
use crate::config::{loader, ValidationError};
use crate::observability::{logging, metrics};
use crate::plugins::{filter, scan, PluginError};
use crate::server::ServerState;
use crate::transport::HttpTransport;

/// The dependency-ordered bootstrap sequence.
pub fn default_stages() -> Vec<Stage> {
    vec![
        Stage::new("config", |s| Box::pin(resolve_config(s))),
        Stage::new("transport", |s| Box::pin(create_transport(s))),
        Stage::new("logging", |s| Box::pin(configure_logging(s))),
        Stage::new("pid", |s| Box::pin(write_pid_file(s))),
        Stage::new("status", |s| Box::pin(register_status_route(s))),
        Stage::new("plugin_scan", |s| Box::pin(plugin_scan(s))),
        Stage::new("plugin_enabled", |s| Box::pin(plugin_enabled(s))),
        Stage::new("plugin_version", |s| Box::pin(plugin_version(s))),
        Stage::new("config_seal", |s| Box::pin(seal_config(s))),
        Stage::new("assets", |s| Box::pin(prepare_assets(s))),
        Stage::new("plugin_init", |s| Box::pin(plugin_init(s))),
    ]
}

/// Resolve the settings overlay into the server configuration.
async fn resolve_config(state: &mut ServerState) -> StageResult {
    let config = loader::resolve(&state.settings)?;
    tracing::info!(
        bind_address = %config.server.bind_address,
        auto_listen = config.server.auto_listen,
        scan_dirs = config.plugins.scan_dirs.len(),
        "configuration resolved"
    );
    state.set_config(config)?;
    Ok(())
}

/// Construct the (still unbound) HTTP transport.
async fn create_transport(state: &mut ServerState) -> StageResult {
    let config = state.config()?;
    let addr: SocketAddr = config.server.bind_address.parse().map_err(|_| {
        crate::config::ConfigError::Validation(vec![ValidationError::BindAddress(
            config.server.bind_address.clone(),
        )])
    })?;
    state.set_transport(Arc::new(HttpTransport::new(addr)));
    Ok(())
}

/// Apply the configured log filter and bring up the metrics exporter.
async fn configure_logging(state: &mut ServerState) -> StageResult {
    let config = state.config()?;
    logging::apply(&config.logging.filter)?;
    if config.metrics.enabled {
        if let Ok(addr) = config.metrics.bind_address.parse() {
            metrics::init(addr);
        }
    }
    Ok(())
}

/// Write the pid file and register its removal on shutdown.
async fn write_pid_file(state: &mut ServerState) -> StageResult {
    let config = state.config()?;
    if let Some(path) = config.server.pid_file.clone() {
        std::fs::write(&path, std::process::id().to_string())?;
        tracing::info!(path = %path.display(), "pid file written");
        state.shutdown.register("pid-file", move || async move {
            std::fs::remove_file(&path).map_err(Into::into)
        });
    }
    Ok(())
}

/// Expose the server's phase and plugin report on `/status`.
async fn register_status_route(state: &mut ServerState) -> StageResult {
    let shared = Arc::clone(&state.status);
    let transport = state.transport()?;
    transport.route(
        "/status",
        get(move || {
            let shared = Arc::clone(&shared);
            async move { Json(shared.snapshot()) }
        }),
    )?;
    Ok(())
}

/// Discover plugins from the configured scan directories.
async fn plugin_scan(state: &mut ServerState) -> StageResult {
    let config = state.config()?;
    state.plugins = scan::discover(&config.plugins.scan_dirs, &state.plugin_set)?;
    Ok(())
}

/// Disable plugins per configuration and verify hard dependencies.
async fn plugin_enabled(state: &mut ServerState) -> StageResult {
    let config = state.config()?;
    filter::check_enabled(&mut state.plugins, &config.plugins.enabled)?;
    Ok(())
}

/// Exclude plugins incompatible with the host version.
async fn plugin_version(state: &mut ServerState) -> StageResult {
    let config = state.config()?;
    let host_version = state.host_version.clone();
    filter::check_version(
        &mut state.plugins,
        &host_version,
        config.plugins.compatibility,
    );
    state.status.set_plugins(state.plugins.statuses());
    Ok(())
}

/// Freeze the configuration: plugins are known, no further writes.
async fn seal_config(state: &mut ServerState) -> StageResult {
    state.seal();
    tracing::debug!("configuration sealed");
    Ok(())
}

/// Verify the UI asset directory and mount it on the transport.
async fn prepare_assets(state: &mut ServerState) -> StageResult {
    let config = state.config()?;
    if let Some(dir) = config.assets.public_dir.clone() {
        let assets = assets::prepare(dir, &config.assets.mount)?;
        let transport = state.transport()?;
        transport.nest_service(&assets.mount, ServeDir::new(&assets.dir))?;
        tracing::info!(
            dir = %assets.dir.display(),
            mount = %assets.mount,
            "ui assets mounted"
        );
        state.ui_assets = Some(assets);
    }
    Ok(())
}

/// Run every surviving plugin's init callback in discovery order.
///
/// The registry is moved aside while inits run so each callback can take
/// the whole server state mutably; descriptors themselves are read-only
/// from here on.
async fn plugin_init(state: &mut ServerState) -> StageResult {
    let registry = std::mem::take(&mut state.plugins);

    let mut failure = None;
    for descriptor in registry.active() {
        tracing::debug!(plugin = %descriptor.id, "initializing plugin");
        let init = descriptor.init_fn();
        if let Err(cause) = init(state).await {
            failure = Some(PluginError::Init {
                id: descriptor.id.clone(),
                cause,
            });
            break;
        }
    }

    state.plugins = registry;

    match failure {
        Some(error) => Err(error.into()),
        None => {
            let initialized = state.plugins.active().count();
            metrics::record_plugins_initialized(initialized);
            tracing::info!(count = initialized, "plugins initialized");
            Ok(())
        }
    }
}
