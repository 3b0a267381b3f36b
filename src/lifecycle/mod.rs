//! Session lifecycle for development mode
//!
//! The incremental build session is acquired once and owned by a guard for
//! the rest of the process. The guard disposes it exactly once, whether it
//! is released explicitly at shutdown or dropped on an error path.

use tracing::{debug, warn};

use crate::bundler::IncrementalBuild;

/// Owns an incremental build and disposes it on every exit path
pub struct SessionGuard<B: IncrementalBuild> {
    session: Option<B>,
}

impl<B: IncrementalBuild> SessionGuard<B> {
    pub fn new(session: B) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// The guarded session, until it is released
    pub fn session(&self) -> Option<&B> {
        self.session.as_ref()
    }

    /// Dispose the session now; later calls do nothing
    pub fn release(&mut self) {
        if let Some(session) = self.session.take() {
            debug!("Disposing build session");
            session.dispose();
        }
    }
}

impl<B: IncrementalBuild> Drop for SessionGuard<B> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Resolves when the process is asked to stop (Ctrl+C, or SIGTERM on unix)
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    debug!("Shutdown requested");
}
