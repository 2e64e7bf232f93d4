//! Lifecycle Module
//!
//! Drives registered singletons and components through their lifecycle.
//!
//! # Lifecycle Phases
//!
//! ```text
//! 1. Registration (any thread)        ← arms the process hooks
//!    ↓
//! 2. Main loop begins                 ← start hook fires
//!    ↓
//! 3. Headless filtering + resolution
//!    ↓
//! 4. Construct (resolved order)       ← Singleton::construct / Component::INIT
//!    ↓
//! 5. Post-init (resolved order)       ← Lifecycle::post_init
//!    ↓
//! [Running...]
//!    ↓
//! 6. Process exit / shutdown signal   ← stop hook fires
//!    ↓
//! 7. Pre-destroy (reverse order)      ← Lifecycle::pre_destroy
//!    ↓
//! 8. Destroy (reverse order)          ← drop instance / Component::DEINIT
//! ```
//!
//! Steps 4 and 5 abort on the first failure. Steps 7 and 8 visit every
//! entry and report failures together.
//!
//! # Example
//!
//! ```rust,ignore
//! use keystone::lifecycle::{Lifecycle, LifecycleError};
//! use keystone::Declare;
//!
//! #[derive(Declare, Default)]
//! #[declare(depends_on = [Settings], singleton)]
//! pub struct PluginManager {
//!     plugins: RwLock<Vec<Plugin>>,
//! }
//!
//! impl Lifecycle for PluginManager {
//!     fn post_init(&self) -> Result<(), LifecycleError> {
//!         tracing::info!("Loading plugins");
//!         Ok(())
//!     }
//!
//!     fn pre_destroy(&self) -> Result<(), LifecycleError> {
//!         tracing::info!("Unloading plugins");
//!         Ok(())
//!     }
//! }
//! ```

mod application;
mod driver;
mod error;
mod hooks;
mod shutdown;
mod traits;

pub use application::{Application, ApplicationBuilder};
pub use driver::{LifecycleDriver, Phase};
pub use error::LifecycleError;
pub use hooks::ProcessHooks;
pub use shutdown::{shutdown_signal, ShutdownHandler};
pub use traits::{Component, ComponentHook, Lifecycle, Singleton};
