/// Catalog API server
use crate::routes::{create_router, AppState};
use anyhow::{bail, Context, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How long `stop` waits for in-flight requests (uploads mostly) to finish
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// HTTP catalog server
///
/// `start` binds and serves on a background task. `addr` reports the bound
/// address afterwards, so binding port 0 yields a usable URL.
pub struct CatalogServer {
    addr: SocketAddr,
    state: AppState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server_handle: Option<JoinHandle<()>>,
}

impl CatalogServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self {
            addr,
            state,
            shutdown_tx: None,
            server_handle: None,
        }
    }

    /// Bind the listener and serve the songs API
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            bail!("Catalog server already running on {}", self.addr);
        }

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("Failed to bind catalog server to {}", self.addr))?;
        self.addr = listener.local_addr()?;
        info!(
            "Catalog API listening on {} (assets: {})",
            self.addr,
            self.state.assets.name()
        );

        let app = create_router(self.state.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("Catalog server error: {}", e);
            }
        });

        self.shutdown_tx = Some(shutdown_tx);
        self.server_handle = Some(handle);

        Ok(())
    }

    /// Stop accepting connections and let running requests complete
    ///
    /// Requests still running after the grace period are cut off.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut handle) = self.server_handle.take() {
            info!("Stopping catalog server");
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
                warn!("Catalog server did not drain within {:?}, aborting", SHUTDOWN_GRACE);
                handle.abort();
            }
        }
    }

    /// Configured address before `start`, bound address after
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL catalog clients should use
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn is_running(&self) -> bool {
        self.server_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for CatalogServer {
    fn drop(&mut self) {
        if let Some(handle) = self.server_handle.take() {
            handle.abort();
        }
    }
}
