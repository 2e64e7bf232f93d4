//! Capability traits a registered type must satisfy
//!
//! The bounds on these traits are the registration-time check: a type that
//! cannot be built without arguments, or that does not carry the lifecycle
//! callbacks, simply does not satisfy `Singleton` and cannot be registered.

use super::LifecycleError;
use crate::registry::Declared;

/// Callbacks invoked on a constructed singleton
///
/// # Example
///
/// ```rust,ignore
/// use keystone::lifecycle::{Lifecycle, LifecycleError};
///
/// impl Lifecycle for ProjectManager {
///     fn post_init(&self) -> Result<(), LifecycleError> {
///         self.reload_recent_projects()
///             .map_err(|e| LifecycleError::init_failed(e.to_string()))
///     }
///
///     fn pre_destroy(&self) -> Result<(), LifecycleError> {
///         self.flush();
///         Ok(())
///     }
/// }
/// ```
pub trait Lifecycle: Send + Sync {
    /// Called once every entry in the resolved order has been constructed
    ///
    /// Dependencies are guaranteed to be constructed and to have had their
    /// own `post_init` called already.
    fn post_init(&self) -> Result<(), LifecycleError>;

    /// Called before any entry is destroyed, in reverse resolved order
    fn pre_destroy(&self) -> Result<(), LifecycleError>;
}

/// A type with exactly one live instance per process and the full
/// four-phase lifecycle
///
/// `#[derive(Declare)]` with `#[declare(singleton)]` implements this through
/// `Default`. Implement it by hand when construction can fail.
pub trait Singleton: Declared + Lifecycle + Sized + 'static {
    /// Build the instance without arguments
    fn construct() -> Result<Self, LifecycleError>;
}

/// Static hook signature used by components
pub type ComponentHook = fn() -> Result<(), LifecycleError>;

/// A type with only static `init`/`deinit` hooks and no instance
///
/// At least one of the two hooks must be provided;
/// [`Orchestrator::register_component`](crate::Orchestrator::register_component)
/// rejects a component with neither at compile time.
///
/// ```rust,ignore
/// struct Telemetry;
///
/// impl Component for Telemetry {
///     const INIT: Option<ComponentHook> = Some(|| telemetry::install());
/// }
/// ```
pub trait Component: Declared + 'static {
    /// Invoked during the construct pass
    const INIT: Option<ComponentHook> = None;

    /// Invoked during the destroy pass
    const DEINIT: Option<ComponentHook> = None;
}
