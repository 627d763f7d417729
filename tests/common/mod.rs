//! Common test utilities for the updater integration tests
//!
//! - [`UpdateServer`] - an axum server playing the update server, with
//!   routes that can answer, fail or never answer
//! - [`TestEngine`] - an engine wired to in-memory settings, a recording
//!   launcher and a temporary working directory
//! - [`appcast_cmd`] - the `appcast` binary isolated from the user's files

// Not every helper is used by every test module
#![allow(dead_code)]

use appcast_updater::config::UpdaterConfig;
use appcast_updater::engine::{UpdateEngine, UpdateEvent};
use appcast_updater::settings::MemorySettings;
use appcast_updater::test_utils::{AppcastFixture, RecordingLauncher, init_test_logging};
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

pub const APPCAST_PATH: &str = "/appcast.json";
pub const CHANGELOG_TEXT: &str = "# 2.0\n\n- Faster startup\n- Fewer bugs\n";

#[derive(Clone)]
enum Route {
    Body(Vec<u8>),
    Status(StatusCode),
    /// Accepts the request and never answers
    Stall,
}

#[derive(Default)]
struct ServerState {
    routes: Mutex<HashMap<String, Route>>,
    hits: Mutex<HashMap<String, usize>>,
}

async fn respond(State(state): State<Arc<ServerState>>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    *state.hits.lock().unwrap().entry(path.clone()).or_default() += 1;
    let route = state.routes.lock().unwrap().get(&path).cloned();

    match route {
        Some(Route::Body(body)) => (StatusCode::OK, body).into_response(),
        Some(Route::Status(status)) => status.into_response(),
        Some(Route::Stall) => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Local HTTP server standing in for the update server.
pub struct UpdateServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    task: JoinHandle<()>,
}

impl UpdateServer {
    pub async fn start() -> Self {
        let state = Arc::new(ServerState::default());
        let app = Router::new().fallback(respond).with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state, task }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    pub fn appcast_url(&self) -> String {
        self.url(APPCAST_PATH)
    }

    fn route(&self, path: &str, route: Route) {
        self.state.routes.lock().unwrap().insert(path.to_string(), route);
    }

    pub fn serve(&self, path: &str, body: impl Into<Vec<u8>>) {
        self.route(path, Route::Body(body.into()));
    }

    pub fn serve_status(&self, path: &str, status: StatusCode) {
        self.route(path, Route::Status(status));
    }

    pub fn stall(&self, path: &str) {
        self.route(path, Route::Stall);
    }

    pub fn hits(&self, path: &str) -> usize {
        self.state.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    /// Publish `fixture` as the appcast, with its installer and changelog.
    pub fn publish_fixture(&self, fixture: &AppcastFixture, installer: &[u8], changelog: &str) {
        self.serve(APPCAST_PATH, fixture.to_json());
        if let Some(url) = &fixture.document.installer_url {
            self.serve(&path_of(url), installer.to_vec());
        }
        if let Some(url) = &fixture.document.changelog_url {
            self.serve(&path_of(url), changelog.as_bytes().to_vec());
        }
    }

    /// Publish `version` with a sha256-checked installer and the standard changelog.
    pub fn publish(&self, version: &str, installer: &[u8]) -> AppcastFixture {
        let fixture = AppcastFixture::new(version, &self.base_url()).with_checksum("sha256", &sha256_hex(installer));
        self.publish_fixture(&fixture, installer, CHANGELOG_TEXT);
        fixture
    }
}

impl Drop for UpdateServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Path component of a fixture URL.
pub fn path_of(url: &str) -> String {
    reqwest::Url::parse(url).unwrap().path().to_string()
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Installer payload large enough for progress reporting.
pub fn installer_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// An engine over a temporary working directory.
pub struct TestEngine {
    pub engine: UpdateEngine,
    pub events: UnboundedReceiver<UpdateEvent>,
    pub settings: Arc<MemorySettings>,
    pub launcher: Arc<RecordingLauncher>,
    pub temp: TempDir,
}

impl TestEngine {
    pub fn new(current_version: &str, server_url: &str) -> Self {
        Self::with_settings(current_version, server_url, Arc::new(MemorySettings::new()), TempDir::new().unwrap())
    }

    /// Reuse settings and a working directory left behind by another engine.
    pub fn with_settings(current_version: &str, server_url: &str, settings: Arc<MemorySettings>, temp: TempDir) -> Self {
        init_test_logging(None);

        let mut config = UpdaterConfig::new("test-app", current_version);
        config.server_url = Some(server_url.to_string());
        config.working_dir = Some(temp.path().join("Update"));

        let launcher = Arc::new(RecordingLauncher::default());
        let engine = UpdateEngine::new(config, settings.clone())
            .unwrap()
            .with_launcher(launcher.clone());
        let events = engine.subscribe();

        Self {
            engine,
            events,
            settings,
            launcher,
            temp,
        }
    }

    pub fn working_dir(&self) -> PathBuf {
        self.engine.working_dir().to_path_buf()
    }

    /// Events emitted since the last call.
    pub fn drain(&mut self) -> Vec<UpdateEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Hand over settings and working directory to a successor engine.
    pub fn into_parts(self) -> (Arc<MemorySettings>, TempDir) {
        (self.settings, self.temp)
    }
}

/// Files left in `dir`, sorted.
pub fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// The `appcast` binary with settings in `temp` and progress bars disabled.
pub fn appcast_cmd(temp: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("appcast").unwrap();
    cmd.env("APPCAST_NO_PROGRESS", "1")
        .env("NO_COLOR", "1")
        .env("APPCAST_CONFIG", temp.join("config.toml"))
        .env("APPCAST_SETTINGS", temp.join("settings.toml"))
        .env_remove("RUST_LOG");
    cmd
}

/// Write a config file for [`appcast_cmd`].
pub fn write_cli_config(temp: &Path, current_version: &str, server_url: Option<&str>) {
    let mut content = format!(
        "app_name = \"test-app\"\ncurrent_version = \"{current_version}\"\nworking_dir = \"{}\"\n",
        temp.join("Update").display().to_string().replace('\\', "\\\\")
    );
    if let Some(url) = server_url {
        content.push_str(&format!("server_url = \"{url}\"\n"));
    }
    std::fs::write(temp.join("config.toml"), content).unwrap();
}
