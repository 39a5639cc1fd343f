//! chassisd - the server chassis daemon.
//!
//! Usage: `chassisd [config.toml] [--set key.path=value ...]`
//!
//! The daemon builds a settings overlay from the command line, constructs
//! a server with the built-in plugin set, listens, and shuts down
//! gracefully on SIGTERM/SIGINT.

use chassis::config::Settings;
use chassis::plugins::PluginSet;
use chassis::server::Server;
use chassis::{lifecycle, observability};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    observability::logging::init("chassis=info,tower_http=warn");

    let settings = settings_from_args(std::env::args().skip(1))?;

    // The daemon ships no built-in plugins; embedders link their own
    // through the library surface.
    let server = Server::new(settings, PluginSet::new());

    let info = server.listen().await?;
    tracing::info!(address = %info.addr, "chassisd started");

    lifecycle::signals::wait_for_shutdown().await;

    if let Err(error) = server.close().await {
        tracing::error!(error = %error, "shutdown finished with failures");
        for failure in &error.failures {
            tracing::error!(callback = %failure.name, error = %failure.error, "cleanup failed");
        }
    }
    tracing::info!("shutdown complete");
    Ok(())
}

/// Build settings from `[config.toml] [--set key=value ...]`.
fn settings_from_args(
    args: impl Iterator<Item = String>,
) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = Settings::new();
    let mut args = args.peekable();

    if let Some(first) = args.peek() {
        if !first.starts_with("--") {
            settings = Settings::from_file(args.next().unwrap_or_default());
        }
    }

    while let Some(arg) = args.next() {
        if arg == "--set" {
            let pair = args
                .next()
                .ok_or("--set requires a key.path=value argument")?;
            let (key, value) = pair
                .split_once('=')
                .ok_or("--set argument must look like key.path=value")?;
            settings = settings.set(key, parse_override(value));
        } else {
            return Err(format!("unrecognized argument: {arg}").into());
        }
    }

    Ok(settings)
}

/// Interpret an override value as bool or integer when possible.
fn parse_override(raw: &str) -> toml::Value {
    if let Ok(b) = raw.parse::<bool>() {
        return b.into();
    }
    if let Ok(i) = raw.parse::<i64>() {
        return i.into();
    }
    raw.to_string().into()
}
