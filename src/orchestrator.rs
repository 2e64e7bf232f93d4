//! The orchestrator: registration pool, resolved run and instance registry
//! behind one value.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::OrchestratorConfig;
use crate::error::{KeystoneError, Result};
use crate::instances::InstanceRegistry;
use crate::lifecycle::{Component, LifecycleDriver, ProcessHooks, Singleton};
use crate::registry::{Declared, Descriptor, Registrar, RegistryEntry};
use crate::resolver;
use crate::snapshot::{EntrySnapshot, RunPhase, Snapshot};

struct RunState {
    phase: RunPhase,
    id: Option<Uuid>,
    driver: Option<LifecycleDriver>,
    /// Registrations of a run whose resolution failed
    unresolved: Vec<Descriptor>,
    dropped: Vec<String>,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
    error: Option<String>,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            phase: RunPhase::Idle,
            id: None,
            driver: None,
            unresolved: Vec::new(),
            dropped: Vec::new(),
            started_at: None,
            stopped_at: None,
            error: None,
        }
    }
}

/// Component lifecycle orchestrator
///
/// Collects registrations, computes one dependency-respecting order and
/// drives every entry through construct → post-init → pre-destroy →
/// destroy. Create one per process and share it by reference.
///
/// # Example
///
/// ```
/// use keystone::{Descriptor, Orchestrator, OrchestratorConfig};
///
/// let orchestrator = Orchestrator::new().with_config(OrchestratorConfig::headless());
/// orchestrator.register(Descriptor::component("Config").init(|| Ok(()))).unwrap();
/// orchestrator
///     .register(Descriptor::component("Logger").depends_on(["Config"]).init(|| Ok(())))
///     .unwrap();
///
/// assert_eq!(orchestrator.resolve_order().unwrap(), ["Config", "Logger"]);
/// orchestrator.start().unwrap();
/// orchestrator.stop().unwrap();
/// ```
pub struct Orchestrator {
    config: OrchestratorConfig,
    hooks: Arc<ProcessHooks>,
    registrar: Registrar,
    instances: Arc<InstanceRegistry>,
    run: Mutex<RunState>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// Create an orchestrator with its own, empty instance registry
    pub fn new() -> Self {
        let hooks = Arc::new(ProcessHooks::new());
        Self {
            config: OrchestratorConfig::default(),
            registrar: Registrar::new(Arc::clone(&hooks)),
            hooks,
            instances: Arc::new(InstanceRegistry::new()),
            run: Mutex::new(RunState::default()),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Publish instances into an existing registry instead of a private one
    pub fn with_instances(mut self, instances: Arc<InstanceRegistry>) -> Self {
        self.instances = instances;
        self
    }

    fn run(&self) -> MutexGuard<'_, RunState> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn hooks(&self) -> &Arc<ProcessHooks> {
        &self.hooks
    }

    pub fn instances(&self) -> &Arc<InstanceRegistry> {
        &self.instances
    }

    pub fn phase(&self) -> RunPhase {
        self.run().phase
    }

    /// Register a descriptor built at runtime
    ///
    /// # Errors
    ///
    /// Rejects malformed descriptors, duplicate names and registrations
    /// made after the run has started.
    pub fn register(&self, descriptor: Descriptor) -> Result<()> {
        self.registrar.register(descriptor)
    }

    /// Register a singleton type from its declared metadata
    pub fn register_singleton<T: Singleton>(&self) -> Result<()> {
        self.register(Descriptor::of_singleton::<T>())
    }

    /// Register a component type from its declared metadata
    ///
    /// A component that provides neither `INIT` nor `DEINIT` fails to
    /// compile.
    pub fn register_component<T: Component>(&self) -> Result<()> {
        const {
            assert!(
                T::INIT.is_some() || T::DEINIT.is_some(),
                "a component must provide an INIT or a DEINIT hook"
            )
        };
        self.register(Descriptor::of_component::<T>())
    }

    /// Live instance of `T`, or `None` before construction and after destroy
    pub fn instance<T: Declared + Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.instances.get_typed::<T>()
    }

    /// The order `start` uses (or used), without constructing anything
    ///
    /// After a start that failed to resolve, this reports the same error.
    pub fn resolve_order(&self) -> Result<Vec<String>> {
        {
            let run = self.run();
            if let Some(driver) = &run.driver {
                return Ok(driver.order());
            }
            if !run.unresolved.is_empty() {
                return resolver::resolve_names(&run.unresolved);
            }
        }
        let graphical = self.config.is_graphical();
        self.registrar.inspect(|descriptors| {
            let (kept, _) = resolver::filter_headless(descriptors.iter().collect(), graphical);
            resolver::resolve_names(&kept)
        })
    }

    /// Resolve the registrations and run the construct and post-init passes
    ///
    /// Registration closes when this is called. Any failure aborts startup;
    /// entries constructed before the failure are not rolled back, and
    /// [`stop`](Self::stop) will refuse to run.
    pub fn start(&self) -> Result<()> {
        let id = Uuid::new_v4();
        {
            let mut run = self.run();
            if run.phase != RunPhase::Idle {
                tracing::warn!("start called while {}", run.phase);
                return Err(KeystoneError::AlreadyStarted);
            }
            run.phase = RunPhase::Starting;
            run.id = Some(id);
            run.started_at = Some(Utc::now());
        }

        let span = tracing::info_span!("keystone_start", run_id = %id);
        let _enter = span.enter();

        let graphical = self.config.is_graphical();
        let descriptors = self.registrar.seal();
        tracing::info!(
            "Starting {} registered entries (graphical: {})",
            descriptors.len(),
            graphical
        );
        let (descriptors, dropped) = resolver::filter_headless(descriptors, graphical);

        let order = match resolver::resolve(&descriptors) {
            Ok(order) => order,
            Err(e) => {
                tracing::error!("Dependency resolution failed: {}", e);
                let mut run = self.run();
                run.phase = RunPhase::Failed;
                run.unresolved = descriptors;
                run.dropped = dropped;
                run.error = Some(e.to_string());
                return Err(e);
            }
        };

        let entries = descriptors.into_iter().map(RegistryEntry::new).collect();
        let mut driver = LifecycleDriver::new(entries, order, Arc::clone(&self.instances));
        tracing::debug!("Resolved order: {:?}", driver.order());

        let result = driver
            .construct_all()
            .and_then(|()| driver.post_init_all());

        let mut run = self.run();
        run.dropped = dropped;
        run.driver = Some(driver);
        match result {
            Ok(()) => {
                run.phase = RunPhase::Running;
                tracing::info!("Startup complete");
                Ok(())
            }
            Err(e) => {
                run.phase = RunPhase::Failed;
                run.error = Some(e.to_string());
                tracing::error!("Startup aborted: {}", e);
                Err(e)
            }
        }
    }

    /// Run the pre-destroy and destroy passes in reverse resolved order
    ///
    /// Only runs after a fully successful [`start`](Self::start); otherwise
    /// returns [`KeystoneError::NotStarted`] without calling any hook.
    /// Per-entry failures do not stop the passes and are reported together
    /// as [`KeystoneError::ShutdownFailed`].
    pub fn stop(&self) -> Result<()> {
        let (mut driver, id) = {
            let mut run = self.run();
            if run.phase != RunPhase::Running {
                tracing::warn!("stop called while {}; nothing to tear down", run.phase);
                return Err(KeystoneError::NotStarted);
            }
            let Some(driver) = run.driver.take() else {
                return Err(KeystoneError::NotStarted);
            };
            run.phase = RunPhase::Stopping;
            (driver, run.id)
        };

        let span = tracing::info_span!("keystone_stop", run_id = ?id);
        let _enter = span.enter();
        tracing::info!("Stopping {} entries", driver.len());

        let result = driver.shutdown();

        let mut run = self.run();
        run.phase = RunPhase::Stopped;
        run.stopped_at = Some(Utc::now());
        run.driver = Some(driver);
        match &result {
            Ok(()) => tracing::info!("Shutdown complete"),
            Err(e) => tracing::error!("{}", e),
        }
        result
    }

    pub fn snapshot(&self) -> Snapshot {
        let run = self.run();
        let entries = match &run.driver {
            Some(driver) => driver.entries().map(EntrySnapshot::of).collect(),
            None if !run.unresolved.is_empty() => {
                run.unresolved.iter().map(EntrySnapshot::pending).collect()
            }
            None => self
                .registrar
                .inspect(|descriptors| descriptors.iter().map(EntrySnapshot::pending).collect()),
        };
        Snapshot {
            run_id: run.id,
            phase: run.phase,
            graphical: self.config.is_graphical(),
            started_at: run.started_at,
            stopped_at: run.stopped_at,
            dropped: run.dropped.clone(),
            entries,
            error: run.error.clone(),
        }
    }
}
