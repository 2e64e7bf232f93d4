//! # Keystone
//!
//! A process-wide component lifecycle orchestrator.
//!
//! Singletons and components register themselves with declared dependencies
//! before the host's main loop starts. Keystone computes one construction
//! order that respects those dependencies, then drives every entry through
//! a fixed lifecycle: construct → post-init → pre-destroy → destroy.
//! Teardown runs in exactly the reverse order.
//!
//! ## Features
//!
//! - **Declarative dependencies**: `#[derive(Declare)]` or an explicit [`Descriptor`]
//! - **Fail-fast resolution**: missing dependencies and cycles are reported by name
//! - **Headless runs**: GUI-only entries are dropped when there is no display
//! - **Typed lookup**: [`Orchestrator::instance`] returns the live singleton
//! - **Process hooks**: [`Application`] brackets a main loop with start and stop
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use keystone::prelude::*;
//!
//! #[derive(Declare)]
//! pub struct Config;
//!
//! impl Component for Config {
//!     const INIT: Option<ComponentHook> = Some(|| Ok(()));
//! }
//!
//! #[derive(Declare, Default)]
//! #[declare(depends_on = [Config], optional = [Metrics], singleton)]
//! pub struct Service;
//!
//! impl Lifecycle for Service {
//!     fn post_init(&self) -> Result<(), LifecycleError> {
//!         Ok(())
//!     }
//!
//!     fn pre_destroy(&self) -> Result<(), LifecycleError> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> keystone::Result<()> {
//!     let app = Application::builder()
//!         .component::<Config>()
//!         .singleton::<Service>()
//!         .build()?;
//!
//!     app.run(async {
//!         let service = app.orchestrator().instance::<Service>();
//!         assert!(service.is_some());
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```

extern crate self as keystone;

pub mod config;
pub mod error;
pub mod instances;
pub mod lifecycle;
pub mod orchestrator;
pub mod registry;
pub mod resolver;
pub mod snapshot;

// Re-export core types
pub use config::{ConfigService, OrchestratorConfig};
pub use error::{KeystoneError, Result, ShutdownFailure};
pub use instances::InstanceRegistry;
pub use lifecycle::{
    Application, ApplicationBuilder, Component, ComponentHook, Lifecycle, LifecycleError, Phase,
    Singleton,
};
pub use orchestrator::Orchestrator;
pub use registry::{Declared, Descriptor, EntryState, Kind};
pub use snapshot::{RunPhase, Snapshot};

// Re-export macros
pub use keystone_macro::Declare;

/// Prelude module for convenient imports
///
/// ```
/// use keystone::prelude::*;
/// ```
pub mod prelude {
    pub use crate::Declare;
    pub use crate::config::{ConfigService, OrchestratorConfig};
    pub use crate::error::KeystoneError;
    pub use crate::lifecycle::{
        Application, ApplicationBuilder, Component, ComponentHook, Lifecycle, LifecycleError,
        ShutdownHandler, Singleton, shutdown_signal,
    };
    pub use crate::orchestrator::Orchestrator;
    pub use crate::registry::{Declared, Descriptor};
    pub use std::sync::Arc;
}
