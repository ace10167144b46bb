//! HTTP surface: dashboard page, JSON status API and the camera form.

pub mod config;
pub mod handlers;
pub mod router;

// Re-export commonly used items
pub use config::ServiceConfig;
pub use router::create_app;

use crate::camera::CameraStore;
use crate::error::{Result, SystemError};
use crate::metrics::{LinuxProbes, Probes, StatusCollector};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Shared handler state. Nothing in it is mutable; every request collects
/// and reads the document afresh.
pub struct AppState<P = LinuxProbes> {
    pub collector: Arc<StatusCollector<P>>,
    pub store: Arc<CameraStore>,
}

impl<P> AppState<P> {
    pub fn new(collector: StatusCollector<P>, store: CameraStore) -> Self {
        Self {
            collector: Arc::new(collector),
            store: Arc::new(store),
        }
    }
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            collector: Arc::clone(&self.collector),
            store: Arc::clone(&self.store),
        }
    }
}

/// Serve the application on an already bound listener.
pub async fn serve<P: Probes + 'static>(
    listener: tokio::net::TcpListener,
    config: &ServiceConfig,
    state: AppState<P>,
) -> Result<()> {
    let app = create_app(config, state);
    axum::serve(listener, app)
        .await
        .map_err(|e| SystemError::web_server_error(format!("Server error: {}", e)))
}

/// Start the status server for the local host.
pub async fn start_web_server(config: ServiceConfig) -> Result<()> {
    config.validate()?;

    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| SystemError::config_error(format!("Invalid bind address: {}", e)))?;

    let state = AppState::new(config.build_collector()?, config.camera_store());

    info!("Starting picam status server on http://{}", addr);
    info!("Status API: http://{}/api/status", addr);
    info!(
        "Camera config: {} (path {:?})",
        config.config_path.display(),
        config.path_name
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SystemError::web_server_error(format!("Failed to bind to address: {}", e)))?;

    serve(listener, &config, state).await
}
