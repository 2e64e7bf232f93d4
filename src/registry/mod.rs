//! Registration pool
//!
//! Producers add [`Descriptor`]s here before the run starts. The pool is
//! guarded by a mutex so registration may happen from several threads, and
//! the first accepted registration arms the process hooks.

mod declared;
mod descriptor;
mod entry;

pub use declared::Declared;
pub use descriptor::{Descriptor, Kind};
pub use entry::{EntryState, RegistryEntry};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{KeystoneError, Result};
use crate::lifecycle::ProcessHooks;

#[derive(Default)]
struct Pool {
    descriptors: Vec<Descriptor>,
    closed: bool,
}

/// Unordered pool of registrations, in registration order
pub struct Registrar {
    pool: Mutex<Pool>,
    hooks: Arc<ProcessHooks>,
}

impl Registrar {
    pub fn new(hooks: Arc<ProcessHooks>) -> Self {
        Self {
            pool: Mutex::new(Pool::default()),
            hooks,
        }
    }

    fn pool(&self) -> MutexGuard<'_, Pool> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate and append a descriptor
    pub fn register(&self, descriptor: Descriptor) -> Result<()> {
        descriptor.validate()?;

        {
            let mut pool = self.pool();
            if pool.closed {
                return Err(KeystoneError::RegistrationClosed {
                    type_name: descriptor.name().to_string(),
                });
            }
            if pool.descriptors.iter().any(|d| d.name() == descriptor.name()) {
                tracing::error!("{} registered twice", descriptor.name());
                return Err(KeystoneError::DuplicateRegistration {
                    type_name: descriptor.name().to_string(),
                });
            }
            tracing::debug!(
                "Registered {} {} (depends on {:?}, optionally {:?})",
                descriptor.kind(),
                descriptor.name(),
                descriptor.dependencies(),
                descriptor.optional_dependencies()
            );
            pool.descriptors.push(descriptor);
        }

        self.hooks.arm();
        Ok(())
    }

    /// Run `f` over the current registrations without consuming them
    pub fn inspect<R>(&self, f: impl FnOnce(&[Descriptor]) -> R) -> R {
        f(&self.pool().descriptors)
    }

    /// Close registration and hand the pool over to a run
    pub fn seal(&self) -> Vec<Descriptor> {
        let mut pool = self.pool();
        pool.closed = true;
        std::mem::take(&mut pool.descriptors)
    }

    pub fn is_sealed(&self) -> bool {
        self.pool().closed
    }

    pub fn len(&self) -> usize {
        self.pool().descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str) -> Descriptor {
        Descriptor::component(name).init(|| Ok(()))
    }

    #[test]
    fn test_register_arms_hooks_once() {
        let hooks = Arc::new(ProcessHooks::new());
        let registrar = Registrar::new(Arc::clone(&hooks));
        assert!(!hooks.is_armed());

        registrar.register(component("A")).unwrap();
        registrar.register(component("B")).unwrap();
        assert!(hooks.is_armed());
        assert_eq!(hooks.arm_count(), 1);
        assert_eq!(registrar.len(), 2);
    }

    #[test]
    fn test_rejected_registration_does_not_arm() {
        let hooks = Arc::new(ProcessHooks::new());
        let registrar = Registrar::new(Arc::clone(&hooks));
        assert!(registrar.register(Descriptor::component("Empty")).is_err());
        assert!(!hooks.is_armed());
        assert!(registrar.is_empty());
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let registrar = Registrar::new(Arc::new(ProcessHooks::new()));
        registrar.register(component("Config")).unwrap();
        let err = registrar.register(component("Config")).unwrap_err();
        assert!(matches!(err, KeystoneError::DuplicateRegistration { .. }));
        assert_eq!(registrar.len(), 1);
    }

    #[test]
    fn test_sealed_pool_rejects_registration() {
        let registrar = Registrar::new(Arc::new(ProcessHooks::new()));
        registrar.register(component("Config")).unwrap();
        let sealed = registrar.seal();
        assert_eq!(sealed.len(), 1);
        assert!(registrar.is_sealed());
        assert!(matches!(
            registrar.register(component("Late")),
            Err(KeystoneError::RegistrationClosed { .. })
        ));
    }

    #[test]
    fn test_concurrent_registration() {
        let hooks = Arc::new(ProcessHooks::new());
        let registrar = Arc::new(Registrar::new(Arc::clone(&hooks)));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registrar = Arc::clone(&registrar);
                std::thread::spawn(move || registrar.register(component(&format!("C{i}"))))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert_eq!(registrar.len(), 8);
        assert_eq!(hooks.arm_count(), 1);
    }
}
