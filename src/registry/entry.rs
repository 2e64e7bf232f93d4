use std::sync::Arc;

use serde::Serialize;
use strum_macros::Display;

use super::descriptor::{Blueprint, Constructed, Descriptor, Kind};
use crate::error::{KeystoneError, Result};
use crate::instances::InstanceRegistry;
use crate::lifecycle::LifecycleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    Unconstructed,
    Constructed,
}

/// One registered type inside a run, together with its lifecycle state
///
/// For singletons the entry is the sole owner of the instance between the
/// construct and destroy passes; the instance registry only ever sees a
/// weak handle.
pub struct RegistryEntry {
    descriptor: Descriptor,
    state: EntryState,
    instance: Option<Constructed>,
}

impl RegistryEntry {
    pub fn new(descriptor: Descriptor) -> Self {
        Self {
            descriptor,
            state: EntryState::Unconstructed,
            instance: None,
        }
    }

    pub fn type_name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn kind(&self) -> Kind {
        self.descriptor.kind()
    }

    pub fn dependencies(&self) -> &[String] {
        self.descriptor.dependencies()
    }

    pub fn optional_dependencies(&self) -> &[String] {
        self.descriptor.optional_dependencies()
    }

    pub fn requires_gui(&self) -> bool {
        self.descriptor.gui_required()
    }

    pub fn state(&self) -> EntryState {
        self.state
    }

    pub fn is_constructed(&self) -> bool {
        self.state == EntryState::Constructed
    }

    /// Build the singleton and publish it, or run the component's `init`
    pub(crate) fn construct(&mut self, instances: &InstanceRegistry) -> Result<()> {
        if self.is_constructed() {
            return Err(KeystoneError::construction_failed(
                self.type_name(),
                "entry is already constructed",
            ));
        }

        match self.descriptor.blueprint() {
            Blueprint::Singleton { factory } => {
                let constructed = factory().map_err(|e| {
                    KeystoneError::construction_failed(self.descriptor.name(), e.to_string())
                })?;
                // Publish before taking ownership so a rejected instance is
                // simply dropped here.
                instances.put(self.descriptor.name(), Arc::downgrade(&constructed.object))?;
                self.instance = Some(constructed);
            }
            Blueprint::Component { init, .. } => {
                if let Some(init) = init {
                    init().map_err(|e| {
                        KeystoneError::construction_failed(self.descriptor.name(), e.to_string())
                    })?;
                }
            }
        }

        self.state = EntryState::Constructed;
        Ok(())
    }

    pub(crate) fn post_init(&self) -> Result<()> {
        match &self.instance {
            Some(instance) => instance
                .hooks
                .post_init()
                .map_err(|e| KeystoneError::post_init_failed(self.type_name(), e.to_string())),
            None => Ok(()),
        }
    }

    pub(crate) fn pre_destroy(&self) -> std::result::Result<(), LifecycleError> {
        match &self.instance {
            Some(instance) => instance.hooks.pre_destroy(),
            None => Ok(()),
        }
    }

    /// Drop the singleton and clear its slot, or run the component's `deinit`
    ///
    /// Destroying an unconstructed entry is a no-op.
    pub(crate) fn destroy(
        &mut self,
        instances: &InstanceRegistry,
    ) -> std::result::Result<(), LifecycleError> {
        if !self.is_constructed() {
            tracing::debug!("{} is not constructed, nothing to destroy", self.type_name());
            return Ok(());
        }
        self.state = EntryState::Unconstructed;

        match self.descriptor.blueprint() {
            Blueprint::Singleton { .. } => {
                instances.clear(self.descriptor.name());
                if let Some(instance) = self.instance.take() {
                    let Constructed { object, hooks } = instance;
                    drop(hooks);
                    let outstanding = Arc::strong_count(&object) - 1;
                    if outstanding > 0 {
                        tracing::warn!(
                            "{} is still referenced {} time(s) outside the orchestrator; it will outlive its destroy pass",
                            self.descriptor.name(),
                            outstanding
                        );
                    }
                }
                Ok(())
            }
            Blueprint::Component { deinit, .. } => match deinit {
                Some(deinit) => deinit(),
                None => Ok(()),
            },
        }
    }

    #[cfg(test)]
    pub(crate) fn instance(&self) -> Option<&Arc<dyn std::any::Any + Send + Sync>> {
        self.instance.as_ref().map(|i| &i.object)
    }
}
