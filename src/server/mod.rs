//! Development server with live reload
//!
//! Serves the docs site with the build output aliased under `/dist`, and
//! pushes reload messages to connected pages. The server watches nothing
//! itself: reloads are triggered only through its [`ReloadSignal`].

mod reload;

use std::net::{IpAddr, SocketAddr, TcpListener};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::services::ServeDir;
use tracing::{debug, error, info};

use crate::error::PortExhaustedError;
use crate::utils::request_path;

pub use reload::{client_script, ReloadMessage, ReloadSignal};

/// WebSocket endpoint for reload messages
pub const RELOAD_ROUTE: &str = "/__kitbuild/reload";

/// Sub-path aliasing the build output directory
pub const DIST_ROUTE: &str = "/dist";

/// Shared server state
pub(crate) struct ServerState {
    docs: PathBuf,
    signal: ReloadSignal,
}

/// Bind the first free port in `range`
///
/// Returns the bound listener rather than the number, so nothing can take
/// the port between selection and use.
pub fn bind_in_range(host: IpAddr, range: RangeInclusive<u16>) -> Result<TcpListener, PortExhaustedError> {
    for port in range.clone() {
        match TcpListener::bind(SocketAddr::new(host, port)) {
            Ok(listener) => return Ok(listener),
            Err(err) => debug!("Port {} unavailable: {}", port, err),
        }
    }

    Err(PortExhaustedError::new(&range))
}

/// Development server
pub struct DevServer {
    docs: PathBuf,
    out: PathBuf,
    signal: ReloadSignal,
}

impl DevServer {
    pub fn new(docs: PathBuf, out: PathBuf, signal: ReloadSignal) -> Self {
        Self { docs, out, signal }
    }

    pub fn router(&self) -> Router {
        let state = Arc::new(ServerState {
            docs: self.docs.clone(),
            signal: self.signal.clone(),
        });

        Router::new()
            .route(RELOAD_ROUTE, get(reload::reload_websocket))
            .nest_service(DIST_ROUTE, ServeDir::new(&self.out))
            .fallback(serve_docs)
            .with_state(state)
    }

    /// Serve on an already bound listener until the task is dropped
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr().context("Failed to read server address")?;
        listener
            .set_nonblocking(true)
            .context("Failed to configure server socket")?;
        let listener = tokio::net::TcpListener::from_std(listener).context("Failed to register server socket")?;

        info!("Server listening on http://{}", addr);

        axum::serve(listener, self.router())
            .await
            .context("Dev server stopped")?;

        Ok(())
    }
}

/// Serve a file from the docs directory
async fn serve_docs(State(state): State<Arc<ServerState>>, uri: Uri) -> Response {
    let relative = request_path(uri.path());
    let mut path = state.docs.join(&relative);

    if path.is_dir() {
        path = path.join("index.html");
    }

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let content_type = get_content_type(&path);
            if content_type.starts_with("text/html") {
                let html = String::from_utf8_lossy(&bytes);
                return Html(inject_reload_client(&html)).into_response();
            }
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, format!("Not found: {}", uri.path())).into_response()
        }
        Err(err) => {
            error!("Failed to read {}: {}", path.display(), err);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read file").into_response()
        }
    }
}

/// Get content type for a file
fn get_content_type(path: &Path) -> &'static str {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match extension {
        "html" | "htm" => "text/html; charset=utf-8",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "json" => "application/json; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "txt" | "md" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Insert the reload client before `</body>`, or append it
fn inject_reload_client(html: &str) -> String {
    let script = client_script(RELOAD_ROUTE);

    match html.rfind("</body>") {
        Some(pos) => {
            let mut result = html.to_string();
            result.insert_str(pos, &script);
            result
        }
        None => format!("{}{}", html, script),
    }
}
