//! Errors returned by user lifecycle hooks

use thiserror::Error;

/// Errors a singleton or component hook can report back to the driver
///
/// The driver wraps these with the failing type's name, so a hook only
/// needs to say what went wrong.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Construction, `init` or `post_init` could not complete
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// `pre_destroy` or `deinit` could not complete
    #[error("Shutdown failed: {0}")]
    ShutdownFailed(String),
}

impl LifecycleError {
    /// Create an initialization failure error
    pub fn init_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    /// Create a shutdown failure error
    pub fn shutdown_failed(msg: impl Into<String>) -> Self {
        Self::ShutdownFailed(msg.into())
    }
}
