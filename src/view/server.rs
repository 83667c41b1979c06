//! Local HTTP viewer
//!
//! Serves a snapshot taken once at startup. The snapshot is shared with the
//! handlers through router state, so nothing here touches the store file
//! after [`ViewState::load`].

use std::net::SocketAddr;
use std::process::{Command, Stdio};
use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use super::render_html;
use crate::config::ServerConfig;
use crate::note::Note;
use crate::store::NoteStore;
use crate::table::Table;
use crate::Result;

/// Immutable snapshot of a store, rendered once.
#[derive(Debug, Clone)]
pub struct ViewState {
    html: Arc<String>,
    notes: Arc<Value>,
}

impl ViewState {
    /// Render the given notes.
    ///
    /// # Errors
    ///
    /// Returns error if the notes cannot be encoded.
    pub fn from_notes(notes: &[Note]) -> Result<Self> {
        let html = render_html(&Table::from_notes(notes)?)?;
        let notes = serde_json::to_value(notes)?;
        Ok(Self {
            html: Arc::new(html),
            notes: Arc::new(notes),
        })
    }

    /// Load a store once and render it.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be loaded.
    pub fn load(store: &dyn NoteStore) -> Result<Self> {
        Self::from_notes(&store.load()?)
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn index(State(state): State<ViewState>) -> Html<String> {
    debug!("serving index");
    Html(state.html.as_ref().clone())
}

async fn notes(State(state): State<ViewState>) -> Json<Value> {
    debug!("serving notes.json");
    Json(state.notes.as_ref().clone())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Routes: `/` (HTML), `/notes.json` (loaded notes), `/health`.
pub fn router(state: ViewState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/notes.json", get(notes))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve `state` until Ctrl+C.
///
/// # Errors
///
/// Returns error if the address cannot be bound or the server fails.
pub async fn serve(state: ViewState, config: &ServerConfig) -> Result<()> {
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    let url = browse_url(listener.local_addr()?);

    info!("serving notes at {url} (stop with ctrl+c)");
    if config.open_browser {
        open_browser(&url);
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down");
    Ok(())
}

fn browse_url(addr: SocketAddr) -> String {
    if addr.ip().is_unspecified() || addr.ip().is_loopback() {
        format!("http://localhost:{}", addr.port())
    } else {
        format!("http://{addr}")
    }
}

/// Open `url` in the default browser. Failures are logged, never returned.
pub fn open_browser(url: &str) {
    let Some(mut command) = opener() else {
        warn!("no browser opener for this platform, open {url} manually");
        return;
    };

    match command
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(_) => debug!(url, "browser opened"),
        Err(e) => warn!(error = %e, "could not open browser, open {url} manually"),
    }
}

#[cfg(target_os = "macos")]
fn opener() -> Option<Command> {
    Some(Command::new("open"))
}

#[cfg(target_os = "windows")]
fn opener() -> Option<Command> {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", ""]);
    Some(command)
}

#[cfg(all(unix, not(target_os = "macos")))]
fn opener() -> Option<Command> {
    Some(Command::new("xdg-open"))
}

#[cfg(not(any(unix, target_os = "windows")))]
fn opener() -> Option<Command> {
    None
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl+c, serving until killed");
        std::future::pending::<()>().await;
    }
    info!("received ctrl+c");
}
