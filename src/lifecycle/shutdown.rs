//! Graceful Shutdown Handler
//!
//! Handles OS signals and runs the stop sequence of an orchestrator.

use super::application::stop_once;
use crate::Orchestrator;
use std::sync::Arc;
use tokio::signal;

/// Runs the stop sequence when the process is asked to terminate
///
/// Use this when the host drives its own main loop instead of
/// [`Application::run`](super::Application::run).
///
/// # Example
///
/// ```rust,ignore
/// use keystone::lifecycle::ShutdownHandler;
///
/// let handler = ShutdownHandler::new(Arc::clone(&orchestrator));
///
/// tokio::spawn(async move {
///     handler.wait_for_shutdown().await;
///     std::process::exit(0);
/// });
/// ```
pub struct ShutdownHandler {
    orchestrator: Arc<Orchestrator>,
}

impl ShutdownHandler {
    /// Create a new ShutdownHandler
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Wait for a shutdown signal, then run the stop sequence
    ///
    /// If signal handlers cannot be installed this never returns.
    pub async fn wait_for_shutdown(&self) {
        wait_for_signal().await;
        self.shutdown();
    }

    /// Run the stop sequence; `false` when it already ran or never armed
    pub(crate) fn shutdown(&self) -> bool {
        tracing::info!("Starting graceful shutdown...");

        match stop_once(&self.orchestrator) {
            Some(Err(e)) => tracing::error!("Error during shutdown: {}", e),
            Some(Ok(())) => tracing::info!("Graceful shutdown complete"),
            None => {
                tracing::debug!("Stop sequence already ran or never armed");
                return false;
            }
        }
        true
    }
}

/// Signal future that never resolves when handlers are unavailable
pub(crate) async fn wait_for_signal() {
    if let Err(e) = shutdown_signal().await {
        tracing::warn!("Signal handlers unavailable, ignoring OS signals: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Completes when a shutdown signal (Ctrl+C or SIGTERM) is received
///
/// Returns `Err` if a signal handler cannot be installed.
///
/// # Example
///
/// ```rust,ignore
/// use keystone::lifecycle::shutdown_signal;
///
/// tokio::select! {
///     _ = shutdown_signal() => {
///         println!("Shutdown signal received");
///     }
///     _ = event_loop.run() => {}
/// }
/// ```
pub async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                tracing::info!("Received Ctrl+C signal");
            },
            _ = terminate.recv() => {
                tracing::info!("Received SIGTERM signal");
            },
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        tracing::info!("Received Ctrl+C signal");
    }

    Ok(())
}
