//! Integration tests for the server lifecycle controller.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use chassis::{Phase, PluginSet, Server, ServerError};

mod common;

#[tokio::test]
async fn concurrent_ready_runs_the_pipeline_once() {
    let dir = tempfile::tempdir().unwrap();
    common::write_plugin(dir.path(), "count", "id = \"count\"\nversion = \"1.0.0\"\n");

    let inits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&inits);
    let set = PluginSet::new().register("count", move |_state| {
        let counter = Arc::clone(&counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    });

    let settings = common::with_scan_dirs(common::base_settings(), &[dir.path()]);
    let server = Server::new(settings, set);

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let server = server.clone();
        tasks.push(tokio::spawn(async move { server.ready().await }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(inits.load(Ordering::SeqCst), 1);
    assert_eq!(server.phase(), Phase::Ready);
}

#[tokio::test]
async fn listen_twice_binds_once() {
    let server = Server::new(common::base_settings(), PluginSet::new());

    let first = server.listen().await.unwrap();
    let second = server.listen().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(server.phase(), Phase::Listening);

    // The bound port really accepts connections.
    tokio::net::TcpStream::connect(first.addr).await.unwrap();

    server.close().await.unwrap();
    assert_eq!(server.phase(), Phase::Closed);
}

#[tokio::test]
async fn auto_listen_starts_the_transport_from_ready() {
    let settings = chassis::Settings::new()
        .set("server.bind_address", "127.0.0.1:0")
        .set("server.auto_listen", true);
    let server = Server::new(settings, PluginSet::new());

    server.ready().await.unwrap();
    assert_eq!(server.phase(), Phase::Listening);
    assert!(server.info().is_some());

    server.close().await.unwrap();
}

#[tokio::test]
async fn inject_boots_on_demand_without_binding() {
    let server = Server::new(common::base_settings(), PluginSet::new());

    let response = server
        .inject(Request::builder().uri("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(server.phase(), Phase::Ready);
    assert!(server.info().is_none());
}

#[tokio::test]
async fn shutdown_callbacks_run_in_reverse_with_aggregate_error() {
    let dir = tempfile::tempdir().unwrap();
    common::write_plugin(dir.path(), "hooks", "id = \"hooks\"\nversion = \"1.0.0\"\n");

    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let hook_log = Arc::clone(&log);
    let set = PluginSet::new().register("hooks", move |state| {
        let log = Arc::clone(&hook_log);
        Box::pin(async move {
            for (name, fail) in [("a", false), ("b", true), ("c", false)] {
                let log = Arc::clone(&log);
                state.shutdown.register(name, move || async move {
                    log.lock().unwrap().push(name);
                    if fail {
                        Err(format!("{name} stuck").into())
                    } else {
                        Ok(())
                    }
                });
            }
            Ok(())
        })
    });

    let settings = common::with_scan_dirs(common::base_settings(), &[dir.path()]);
    let server = Server::new(settings, set);
    server.ready().await.unwrap();

    let err = server.close().await.unwrap_err();
    assert_eq!(*log.lock().unwrap(), ["c", "b", "a"]);
    assert_eq!(err.failures.len(), 1);
    assert_eq!(err.failures[0].name, "b");
    assert_eq!(server.phase(), Phase::Closed);
}

#[tokio::test]
async fn close_is_idempotent_and_pins_the_server() {
    let server = Server::new(common::base_settings(), PluginSet::new());
    server.ready().await.unwrap();

    server.close().await.unwrap();
    server.close().await.unwrap();

    let err = server.listen().await.unwrap_err();
    assert!(matches!(err, ServerError::Closed));
}

#[tokio::test]
async fn pid_file_is_written_and_removed() {
    let dir = tempfile::tempdir().unwrap();
    let pid_path = dir.path().join("chassisd.pid");

    let settings = common::base_settings().set(
        "server.pid_file",
        pid_path.display().to_string(),
    );
    let server = Server::new(settings, PluginSet::new());

    server.ready().await.unwrap();
    let written = std::fs::read_to_string(&pid_path).unwrap();
    assert_eq!(written, std::process::id().to_string());

    server.close().await.unwrap();
    assert!(!pid_path.exists());
}

#[tokio::test]
async fn ui_assets_are_served_through_inject() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>chassis</h1>").unwrap();

    let settings = common::base_settings().set(
        "assets.public_dir",
        dir.path().display().to_string(),
    );
    let server = Server::new(settings, PluginSet::new());

    let response = server
        .inject(
            Request::builder()
                .uri("/ui/index.html")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"<h1>chassis</h1>");
}

#[tokio::test]
async fn missing_asset_directory_fails_the_assets_stage() {
    let settings = common::base_settings().set(
        "assets.public_dir",
        "/definitely/not/a/real/dir".to_string(),
    );
    let server = Server::new(settings, PluginSet::new());

    let err = server.ready().await.unwrap_err();
    match err {
        ServerError::Bootstrap(e) => assert_eq!(e.stage, "assets"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(server.phase(), Phase::Failed);
}
