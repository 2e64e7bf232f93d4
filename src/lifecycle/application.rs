//! Application Bootstrap
//!
//! Hosts an orchestrator around a main loop: the start sequence runs once
//! the loop is being polled, the stop sequence when it ends or the process
//! is asked to terminate.

use super::shutdown::wait_for_signal;
use super::{Component, ShutdownHandler, Singleton};
use crate::config::OrchestratorConfig;
use crate::error::{KeystoneError, Result};
use crate::instances::InstanceRegistry;
use crate::registry::Descriptor;
use crate::Orchestrator;
use std::future::Future;
use std::sync::Arc;

/// Fire the armed start hook; `None` when it is unarmed or already fired
pub(crate) fn start_once(orchestrator: &Orchestrator) -> Option<Result<()>> {
    orchestrator.hooks().fire_start(|| orchestrator.start())
}

/// Fire the stop hook; `None` when start never fired or stop already ran
pub(crate) fn stop_once(orchestrator: &Orchestrator) -> Option<Result<()>> {
    orchestrator.hooks().fire_stop(|| orchestrator.stop())
}

/// Host for an orchestrator
///
/// # Example
///
/// ```rust,ignore
/// use keystone::lifecycle::Application;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let app = Application::builder()
///         .component::<Config>()
///         .component::<Logger>()
///         .singleton::<Service>()
///         .build()?;
///
///     app.run(event_loop()).await?;
///     Ok(())
/// }
/// ```
pub struct Application {
    orchestrator: Arc<Orchestrator>,
}

impl Application {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self::shared(Arc::new(orchestrator))
    }

    pub fn shared(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Create a new application builder
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Create a shutdown handler bound to this application's orchestrator
    pub fn shutdown_handler(&self) -> ShutdownHandler {
        ShutdownHandler::new(Arc::clone(&self.orchestrator))
    }

    /// Spawn a background task that waits for shutdown signals
    /// and runs the stop sequence.
    pub fn spawn_shutdown_handler(&self) -> tokio::task::JoinHandle<()> {
        let shutdown_handler = self.shutdown_handler();
        tokio::spawn(async move {
            shutdown_handler.wait_for_shutdown().await;
        })
    }

    /// Run the start sequence through the process hook
    ///
    /// With nothing registered the hook is unarmed and this is a no-op.
    pub fn start(&self) -> Result<()> {
        match start_once(&self.orchestrator) {
            Some(result) => result,
            None if self.orchestrator.hooks().start_fired() => Err(KeystoneError::AlreadyStarted),
            None => {
                tracing::debug!("Nothing registered; start sequence not armed");
                Ok(())
            }
        }
    }

    /// Run the stop sequence through the process hook
    pub fn stop(&self) -> Result<()> {
        stop_once(&self.orchestrator).unwrap_or(Err(KeystoneError::NotStarted))
    }

    /// Bracket `main` with the start and stop sequences
    ///
    /// Start runs once the runtime is polling this future. `main` then runs
    /// until it completes or a shutdown signal arrives, in which case the
    /// output is `None`. If start fails, `main` is never polled.
    pub async fn run<F: Future>(&self, main: F) -> Result<Option<F::Output>> {
        tokio::task::yield_now().await;
        self.start()?;

        let output = tokio::select! {
            output = main => Some(output),
            _ = wait_for_signal() => {
                tracing::info!("Main loop interrupted by shutdown signal");
                None
            }
        };

        if self.orchestrator.hooks().start_fired() {
            self.stop()?;
        }
        Ok(output)
    }
}

impl Drop for Application {
    fn drop(&mut self) {
        match stop_once(&self.orchestrator) {
            Some(Err(KeystoneError::NotStarted)) => {
                tracing::debug!("Startup never completed; nothing to stop at exit")
            }
            Some(Err(e)) => tracing::error!("Stop sequence at exit failed: {}", e),
            Some(Ok(())) => tracing::debug!("Stop sequence ran at exit"),
            None => {}
        }
    }
}

/// Builder for Application
///
/// Registration errors are held until [`build`](Self::build) so the
/// registration calls can be chained.
pub struct ApplicationBuilder {
    config: Option<OrchestratorConfig>,
    instances: Option<Arc<InstanceRegistry>>,
    pending: Vec<Pending>,
}

enum Pending {
    Descriptor(Descriptor),
    Typed(fn(&Orchestrator) -> Result<()>),
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            instances: None,
            pending: Vec::new(),
        }
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Publish instances into an existing registry
    pub fn instances(mut self, instances: Arc<InstanceRegistry>) -> Self {
        self.instances = Some(instances);
        self
    }

    pub fn register(mut self, descriptor: Descriptor) -> Self {
        self.pending.push(Pending::Descriptor(descriptor));
        self
    }

    pub fn singleton<T: Singleton>(mut self) -> Self {
        self.pending
            .push(Pending::Typed(|o| o.register_singleton::<T>()));
        self
    }

    pub fn component<T: Component>(mut self) -> Self {
        self.pending
            .push(Pending::Typed(|o| o.register_component::<T>()));
        self
    }

    /// Register everything, in call order
    ///
    /// # Errors
    ///
    /// Returns the first registration error.
    pub fn build(self) -> Result<Application> {
        let mut orchestrator = Orchestrator::new();
        if let Some(config) = self.config {
            orchestrator = orchestrator.with_config(config);
        }
        if let Some(instances) = self.instances {
            orchestrator = orchestrator.with_instances(instances);
        }

        for pending in self.pending {
            match pending {
                Pending::Descriptor(descriptor) => orchestrator.register(descriptor)?,
                Pending::Typed(register) => register(&orchestrator)?,
            }
        }

        Ok(Application::new(orchestrator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::RunPhase;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn app() -> Application {
        Application::builder()
            .config(OrchestratorConfig::headless())
            .register(Descriptor::component("Config").init(|| Ok(())))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_run_brackets_main() {
        let app = app();
        let orchestrator = Arc::clone(app.orchestrator());

        let output = app
            .run(async {
                assert_eq!(orchestrator.phase(), RunPhase::Running);
                7
            })
            .await
            .unwrap();

        assert_eq!(output, Some(7));
        assert_eq!(app.orchestrator().phase(), RunPhase::Stopped);
    }

    #[tokio::test]
    async fn test_failed_start_skips_main() {
        let app = Application::builder()
            .config(OrchestratorConfig::headless())
            .register(Descriptor::component("Logger").depends_on(["Config"]).init(|| Ok(())))
            .build()
            .unwrap();

        let ran = AtomicBool::new(false);
        let err = app
            .run(async { ran.store(true, Ordering::SeqCst) })
            .await
            .unwrap_err();
        assert!(matches!(err, KeystoneError::MissingDependency { .. }));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_drop_runs_stop_once() {
        let app = app();
        let orchestrator = Arc::clone(app.orchestrator());
        app.start().unwrap();
        assert!(matches!(app.start(), Err(KeystoneError::AlreadyStarted)));

        drop(app);
        assert_eq!(orchestrator.phase(), RunPhase::Stopped);
        assert!(orchestrator.hooks().stop_fired());
    }

    #[test]
    fn test_unarmed_application_is_inert() {
        let app = Application::builder()
            .config(OrchestratorConfig::headless())
            .build()
            .unwrap();
        app.start().unwrap();
        assert_eq!(app.orchestrator().phase(), RunPhase::Idle);
        assert!(matches!(app.stop(), Err(KeystoneError::NotStarted)));
    }

    #[test]
    fn test_builder_reports_registration_errors() {
        let result = Application::builder()
            .register(Descriptor::component("Config").init(|| Ok(())))
            .register(Descriptor::component("Config").init(|| Ok(())))
            .build();
        assert!(matches!(
            result,
            Err(KeystoneError::DuplicateRegistration { .. })
        ));
    }
}
