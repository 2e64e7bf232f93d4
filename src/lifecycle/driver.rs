//! Lifecycle Driver
//!
//! Walks the resolved order and executes the four lifecycle passes.

use std::sync::Arc;

use serde::Serialize;
use strum_macros::{Display, EnumIter};

use crate::error::{KeystoneError, Result, ShutdownFailure};
use crate::instances::InstanceRegistry;
use crate::registry::{Kind, RegistryEntry};

/// The four lifecycle passes, in the order a full run executes them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Construct,
    PostInit,
    PreDestroy,
    Destroy,
}

/// Executes lifecycle passes over one resolved set of entries
///
/// The LifecycleDriver is responsible for:
/// - Constructing entries in resolved order and publishing singletons
/// - Calling `post_init` once the whole set is constructed
/// - Tearing everything down in exactly the reverse order
///
/// Startup passes stop at the first failure and do not roll back what was
/// already constructed. Shutdown passes visit every entry and collect
/// failures.
///
/// # Example
///
/// ```rust,ignore
/// let mut driver = LifecycleDriver::new(entries, order, instances);
///
/// driver.construct_all()?;
/// driver.post_init_all()?;
/// // ... application runs ...
/// let mut failures = driver.pre_destroy_all();
/// failures.extend(driver.destroy_all());
/// ```
pub struct LifecycleDriver {
    entries: Vec<RegistryEntry>,
    order: Vec<usize>,
    instances: Arc<InstanceRegistry>,
}

impl LifecycleDriver {
    /// Create a driver over `entries`, where `order` indexes into `entries`
    pub fn new(entries: Vec<RegistryEntry>, order: Vec<usize>, instances: Arc<InstanceRegistry>) -> Self {
        debug_assert_eq!(entries.len(), order.len());
        Self {
            entries,
            order,
            instances,
        }
    }

    /// Entries in resolved order
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &RegistryEntry> + '_ {
        self.order.iter().map(move |&i| &self.entries[i])
    }

    /// Type names in resolved order
    pub fn order(&self) -> Vec<String> {
        self.entries().map(|e| e.type_name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn constructed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_constructed()).count()
    }

    pub fn instances(&self) -> &Arc<InstanceRegistry> {
        &self.instances
    }

    /// Construct every entry in resolved order
    ///
    /// Singletons are built and published to the instance registry,
    /// components run their `init` hook.
    pub fn construct_all(&mut self) -> Result<()> {
        tracing::info!("Calling {} pass...", Phase::Construct);

        for &index in &self.order {
            let entry = &mut self.entries[index];
            tracing::debug!("Constructing: {} ({})", entry.type_name(), entry.kind());
            entry.construct(&self.instances).inspect_err(|e| {
                tracing::error!("{} failed for {}: {}", Phase::Construct, entry.type_name(), e);
            })?;
            tracing::debug!("Constructed: {}", entry.type_name());
        }

        tracing::info!(
            "{} pass complete ({} entries constructed)",
            Phase::Construct,
            self.order.len()
        );
        Ok(())
    }

    /// Call `post_init` on every constructed singleton in resolved order
    pub fn post_init_all(&self) -> Result<()> {
        tracing::info!("Calling {} pass...", Phase::PostInit);

        let mut called = 0;
        for entry in self.entries() {
            if !entry.is_constructed() {
                continue;
            }
            if entry.kind() == Kind::Component {
                continue;
            }
            tracing::debug!("Post-initializing: {}", entry.type_name());
            entry.post_init().inspect_err(|e| {
                tracing::error!("{} failed for {}: {}", Phase::PostInit, entry.type_name(), e);
            })?;
            called += 1;
        }

        tracing::info!(
            "{} pass complete ({} hooks executed)",
            Phase::PostInit,
            called
        );
        Ok(())
    }

    /// Call `pre_destroy` on every singleton in **reverse** resolved order
    ///
    /// Failures are logged and collected; every entry is still visited.
    pub fn pre_destroy_all(&self) -> Vec<ShutdownFailure> {
        tracing::info!("Calling {} pass...", Phase::PreDestroy);

        let mut failures = Vec::new();
        let mut called = 0;
        for entry in self.entries().rev() {
            if !entry.is_constructed() || entry.kind() == Kind::Component {
                continue;
            }
            tracing::debug!("Pre-destroying: {}", entry.type_name());
            if let Err(e) = entry.pre_destroy() {
                // Log error but continue with other entries
                tracing::error!("{} failed for {}: {}", Phase::PreDestroy, entry.type_name(), e);
                failures.push(ShutdownFailure {
                    type_name: entry.type_name().to_string(),
                    phase: Phase::PreDestroy,
                    message: e.to_string(),
                });
            }
            called += 1;
        }

        tracing::info!(
            "{} pass complete ({} hooks executed, {} failed)",
            Phase::PreDestroy,
            called,
            failures.len()
        );
        failures
    }

    /// Destroy every entry in **reverse** resolved order
    ///
    /// Singletons are dropped and their slot cleared, components run their
    /// `deinit` hook. Failures are logged and collected.
    pub fn destroy_all(&mut self) -> Vec<ShutdownFailure> {
        tracing::info!("Calling {} pass...", Phase::Destroy);

        let mut failures = Vec::new();
        for &index in self.order.iter().rev() {
            let entry = &mut self.entries[index];
            tracing::debug!("Destroying: {}", entry.type_name());
            if let Err(e) = entry.destroy(&self.instances) {
                tracing::error!("{} failed for {}: {}", Phase::Destroy, entry.type_name(), e);
                failures.push(ShutdownFailure {
                    type_name: entry.type_name().to_string(),
                    phase: Phase::Destroy,
                    message: e.to_string(),
                });
            }
        }

        tracing::info!(
            "{} pass complete ({} entries, {} failed)",
            Phase::Destroy,
            self.order.len(),
            failures.len()
        );
        failures
    }

    /// Both shutdown passes, folded into one result
    pub fn shutdown(&mut self) -> Result<()> {
        let mut failures = self.pre_destroy_all();
        failures.extend(self.destroy_all());
        if failures.is_empty() {
            Ok(())
        } else {
            Err(KeystoneError::ShutdownFailed { failures })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{Lifecycle, LifecycleError};
    use crate::registry::Descriptor;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Tracked {
        name: &'static str,
        log: Log,
        fail_pre_destroy: bool,
    }

    impl Lifecycle for Tracked {
        fn post_init(&self) -> std::result::Result<(), LifecycleError> {
            self.log.lock().unwrap().push(format!("post_init:{}", self.name));
            Ok(())
        }

        fn pre_destroy(&self) -> std::result::Result<(), LifecycleError> {
            self.log.lock().unwrap().push(format!("pre_destroy:{}", self.name));
            if self.fail_pre_destroy {
                return Err(LifecycleError::shutdown_failed("still busy"));
            }
            Ok(())
        }
    }

    fn singleton(name: &'static str, log: &Log, fail_pre_destroy: bool) -> RegistryEntry {
        let log = Arc::clone(log);
        RegistryEntry::new(Descriptor::singleton(name, move || {
            Ok(Tracked {
                name,
                log: Arc::clone(&log),
                fail_pre_destroy,
            })
        }))
    }

    fn component(name: &'static str, log: &Log) -> RegistryEntry {
        let on_init = Arc::clone(log);
        let on_deinit = Arc::clone(log);
        RegistryEntry::new(
            Descriptor::component(name)
                .init(move || {
                    on_init.lock().unwrap().push(format!("init:{name}"));
                    Ok(())
                })
                .deinit(move || {
                    on_deinit.lock().unwrap().push(format!("deinit:{name}"));
                    Ok(())
                }),
        )
    }

    #[test]
    fn test_passes_run_in_order_and_reverse() {
        let log: Log = Arc::default();
        let entries = vec![singleton("Service", &log, false), component("Config", &log)];
        // Config first, then Service
        let mut driver = LifecycleDriver::new(entries, vec![1, 0], Arc::new(InstanceRegistry::new()));

        driver.construct_all().unwrap();
        driver.post_init_all().unwrap();
        assert!(driver.instances().contains("Service"));
        driver.shutdown().unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            [
                "init:Config",
                "post_init:Service",
                "pre_destroy:Service",
                "deinit:Config",
            ]
        );
        assert!(!driver.instances().contains("Service"));
        assert_eq!(driver.constructed_count(), 0);
    }

    #[test]
    fn test_shutdown_collects_failures_and_continues() {
        let log: Log = Arc::default();
        let entries = vec![
            singleton("A", &log, true),
            singleton("B", &log, true),
            component("C", &log),
        ];
        let mut driver = LifecycleDriver::new(entries, vec![0, 1, 2], Arc::new(InstanceRegistry::new()));
        driver.construct_all().unwrap();
        driver.post_init_all().unwrap();

        let err = driver.shutdown().unwrap_err();
        let KeystoneError::ShutdownFailed { failures } = err else {
            panic!("expected shutdown failure");
        };
        let failed: Vec<_> = failures.iter().map(|f| f.type_name.as_str()).collect();
        assert_eq!(failed, ["B", "A"]);
        assert!(failures.iter().all(|f| f.phase == Phase::PreDestroy));

        // Destroy still ran for every entry
        assert_eq!(driver.constructed_count(), 0);
        assert!(log.lock().unwrap().contains(&"deinit:C".to_string()));
    }

    #[test]
    fn test_construct_aborts_without_rollback() {
        let log: Log = Arc::default();
        let entries = vec![
            component("First", &log),
            RegistryEntry::new(Descriptor::component("Broken").init(|| {
                Err(LifecycleError::init_failed("disk full"))
            })),
            component("Never", &log),
        ];
        let mut driver = LifecycleDriver::new(entries, vec![0, 1, 2], Arc::new(InstanceRegistry::new()));

        let err = driver.construct_all().unwrap_err();
        assert!(matches!(
            err,
            KeystoneError::ConstructionFailed { ref type_name, .. } if type_name == "Broken"
        ));
        assert_eq!(driver.constructed_count(), 1);
        assert_eq!(*log.lock().unwrap(), ["init:First"]);
    }

    #[test]
    fn test_phases_in_run_order() {
        use strum::IntoEnumIterator;

        let names: Vec<String> = Phase::iter().map(|p| p.to_string()).collect();
        assert_eq!(names, ["construct", "post-init", "pre-destroy", "destroy"]);
    }
}
