//! Integration tests for the bootstrap pipeline.

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::routing::get;
use chassis::config::{ChassisConfig, ConfigError};
use chassis::{PluginSet, Server, ServerError, Settings};

mod common;

fn bootstrap_stage(err: ServerError) -> &'static str {
    match err {
        ServerError::Bootstrap(e) => e.stage,
        other => panic!("expected a bootstrap error, got: {other}"),
    }
}

#[tokio::test]
async fn invalid_bind_address_fails_the_config_stage() {
    let settings = Settings::new().set("server.bind_address", "not-an-address");
    let server = Server::new(settings, PluginSet::new());

    let err = server.ready().await.unwrap_err();
    assert_eq!(bootstrap_stage(err), "config");
}

#[tokio::test]
async fn overrides_win_over_the_config_file() {
    let assets = tempfile::tempdir().unwrap();
    std::fs::write(assets.path().join("index.html"), "ok").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            "[server]\nbind_address = \"127.0.0.1:0\"\nauto_listen = false\n\n\
             [assets]\npublic_dir = \"{}\"\nmount = \"/files\"\n",
            assets.path().display()
        ),
    )
    .unwrap();

    let settings = Settings::from_file(&config_path).set("assets.mount", "/docs");
    let server = Server::new(settings, PluginSet::new());

    let hit = server
        .inject(Request::builder().uri("/docs/index.html").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(hit.status(), StatusCode::OK);

    let miss = server
        .inject(Request::builder().uri("/files/index.html").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(miss.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn config_is_sealed_before_plugins_initialize() {
    let dir = tempfile::tempdir().unwrap();
    common::write_plugin(dir.path(), "probe", "id = \"probe\"\nversion = \"1.0.0\"\n");

    let set = PluginSet::new().register("probe", |state| {
        Box::pin(async move {
            assert!(state.sealed());
            let attempt = state.set_config(ChassisConfig::default());
            assert!(matches!(attempt, Err(ConfigError::Sealed)));
            state.register_capability("probe.sealed", serde_json::Value::Bool(true));
            Ok(())
        })
    });

    let settings = common::with_scan_dirs(common::base_settings(), &[dir.path()]);
    let server = Server::new(settings, set);
    server.ready().await.unwrap();

    assert_eq!(
        server.capability("probe.sealed"),
        Some(serde_json::Value::Bool(true))
    );
}

#[tokio::test]
async fn plugin_routes_are_servable_through_inject() {
    let dir = tempfile::tempdir().unwrap();
    common::write_plugin(dir.path(), "greeter", "id = \"greeter\"\nversion = \"1.0.0\"\n");

    let set = PluginSet::new().register("greeter", |state| {
        Box::pin(async move {
            let transport = state.transport()?;
            transport.route("/hello", get(|| async { "hello from greeter" }))?;
            Ok(())
        })
    });

    let settings = common::with_scan_dirs(common::base_settings(), &[dir.path()]);
    let server = Server::new(settings, set);

    let response = server
        .inject(Request::builder().uri("/hello").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"hello from greeter");
}

#[tokio::test]
async fn status_reports_identity_and_phase() {
    let server = Server::new(common::base_settings(), PluginSet::new());

    let response = server
        .inject(Request::builder().uri("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["name"], "chassis");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["phase"], "ready");
}

#[tokio::test]
async fn missing_config_file_fails_the_config_stage() {
    let settings = Settings::from_file("/no/such/config.toml");
    let server = Server::new(settings, PluginSet::new());

    let err = server.ready().await.unwrap_err();
    assert_eq!(bootstrap_stage(err), "config");
}
