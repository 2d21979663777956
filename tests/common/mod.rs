//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{http::StatusCode, routing::post, Router};
use teleport_web::config::{LoginPolicy, WebConfig};
use teleport_web::db::CURRENT_DB_VERSION;
use teleport_web::session::{SessionError, SessionManager};
use tokio::net::TcpListener;

/// Bodies received by a mock core server.
pub type Captured = Arc<Mutex<Vec<String>>>;

/// Start a mock core RPC server answering every POST /rpc with `status` and
/// `body` after `delay`. Returns its RPC URL and the captured request bodies.
pub async fn start_core_server(
    status: u16,
    body: &'static str,
    delay: Duration,
) -> (String, Captured) {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();

    let app = Router::new().route(
        "/rpc",
        post(move |request_body: String| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().push(request_body);
                tokio::time::sleep(delay).await;
                (StatusCode::from_u16(status).unwrap(), body)
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{}/rpc", addr), captured)
}

/// Create `tp_config` at `path` with a schema version and optional rows.
pub fn seed_database(path: &Path, version: u32, rows: &[(&str, &str)]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute(
        "create table tp_config (name text primary key, value text not null)",
        [],
    )
    .unwrap();
    conn.execute(
        "insert into tp_config (name, value) values ('db_ver', ?1)",
        [version.to_string()],
    )
    .unwrap();
    for (name, value) in rows {
        conn.execute("insert into tp_config (name, value) values (?1, ?2)", [name, value])
            .unwrap();
    }
}

pub fn seed_ready_database(path: &Path) {
    seed_database(path, CURRENT_DB_VERSION, &[]);
}

/// Config bound to `ip:port` with an unreachable core service.
pub fn web_config(ip: &str, port: u16) -> WebConfig {
    let mut config = WebConfig::default();
    config.common.ip = ip.to_string();
    config.common.port = port;
    config.common.core_server_rpc = "http://127.0.0.1:1/rpc".to_string();
    config
}

/// Poll `url` until it answers or `attempts` run out.
pub async fn wait_for_http(url: &str, attempts: u32) -> reqwest::Response {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    for _ in 0..attempts {
        if let Ok(res) = client.get(url).send().await {
            return res;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("server at {url} never answered");
}

/// Session manager that only records lifecycle calls.
#[derive(Default)]
pub struct RecordingSessions {
    calls: Mutex<Vec<&'static str>>,
}

impl RecordingSessions {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

impl SessionManager for RecordingSessions {
    fn init(&self, _policy: &LoginPolicy) -> Result<(), SessionError> {
        self.calls.lock().unwrap().push("init");
        Ok(())
    }

    fn start(&self) {
        self.calls.lock().unwrap().push("start");
    }

    fn stop(&self) {
        self.calls.lock().unwrap().push("stop");
    }
}

pub fn loopback(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}
