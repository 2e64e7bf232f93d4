use std::any::Any;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::{KeystoneError, Result};
use crate::registry::Declared;

type Slot = Weak<dyn Any + Send + Sync>;

/// Thread-safe map from type name to the live singleton of that type.
///
/// The registry never owns what it points at: slots hold weak handles, and
/// an instance is dropped by the lifecycle driver alone. A slot whose handle
/// no longer upgrades counts as empty.
#[derive(Default)]
pub struct InstanceRegistry {
    slots: DashMap<String, Slot>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Live instance registered under `type_name`, if any
    pub fn get(&self, type_name: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.slots.get(type_name).and_then(|slot| slot.upgrade())
    }

    /// Live instance registered under `type_name`, downcast to `T`
    pub fn get_as<T: Any + Send + Sync>(&self, type_name: &str) -> Option<Arc<T>> {
        let instance = self.get(type_name)?;
        match instance.downcast::<T>() {
            Ok(instance) => Some(instance),
            Err(_) => {
                tracing::warn!(
                    "Instance under {} is not a {}",
                    type_name,
                    std::any::type_name::<T>()
                );
                None
            }
        }
    }

    /// Live instance of a declared type
    pub fn get_typed<T: Declared + Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.get_as::<T>(T::TYPE_NAME)
    }

    /// Publish a live instance under `type_name`
    ///
    /// An occupied slot keeps its current instance; the new handle is
    /// ignored and [`KeystoneError::SlotOccupied`] is returned.
    pub fn put(&self, type_name: &str, instance: Slot) -> Result<()> {
        match self.slots.entry(type_name.to_string()) {
            Entry::Occupied(mut slot) => {
                if slot.get().strong_count() > 0 && instance.strong_count() > 0 {
                    tracing::error!(
                        "Refusing to replace the live instance of {}; keeping the existing one",
                        type_name
                    );
                    return Err(KeystoneError::SlotOccupied {
                        type_name: type_name.to_string(),
                    });
                }
                slot.insert(instance);
            }
            Entry::Vacant(slot) => {
                slot.insert(instance);
            }
        }
        tracing::trace!("Published instance of {}", type_name);
        Ok(())
    }

    /// Empty the slot for `type_name`; always succeeds
    pub fn clear(&self, type_name: &str) {
        if self.slots.remove(type_name).is_some() {
            tracing::trace!("Cleared instance slot of {}", type_name);
        }
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.slots
            .get(type_name)
            .is_some_and(|slot| slot.strong_count() > 0)
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.value().strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Settings {
        value: i32,
    }

    impl Declared for Settings {
        const TYPE_NAME: &'static str = "Settings";
    }

    fn publish<T: Any + Send + Sync>(registry: &InstanceRegistry, name: &str, value: &Arc<T>) -> Result<()> {
        let erased: Arc<dyn Any + Send + Sync> = value.clone();
        registry.put(name, Arc::downgrade(&erased))
    }

    #[test]
    fn test_put_and_get() {
        let registry = InstanceRegistry::new();
        let settings = Arc::new(Settings { value: 42 });
        publish(&registry, "Settings", &settings).unwrap();

        assert!(registry.contains("Settings"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_typed::<Settings>().unwrap().value, 42);
        assert!(registry.get("Other").is_none());
    }

    #[test]
    fn test_second_live_instance_is_rejected() {
        let registry = InstanceRegistry::new();
        let first = Arc::new(Settings { value: 1 });
        let second = Arc::new(Settings { value: 2 });
        publish(&registry, "Settings", &first).unwrap();

        let err = publish(&registry, "Settings", &second).unwrap_err();
        assert!(matches!(err, KeystoneError::SlotOccupied { .. }));
        assert_eq!(registry.get_typed::<Settings>().unwrap().value, 1);
    }

    #[test]
    fn test_dead_slot_can_be_reused() {
        let registry = InstanceRegistry::new();
        let first = Arc::new(Settings { value: 1 });
        publish(&registry, "Settings", &first).unwrap();
        drop(first);
        assert!(!registry.contains("Settings"));
        assert!(registry.is_empty());

        let second = Arc::new(Settings { value: 2 });
        publish(&registry, "Settings", &second).unwrap();
        assert_eq!(registry.get_typed::<Settings>().unwrap().value, 2);
    }

    #[test]
    fn test_clear_never_drops_the_instance() {
        let registry = InstanceRegistry::new();
        let settings = Arc::new(Settings { value: 7 });
        publish(&registry, "Settings", &settings).unwrap();
        registry.clear("Settings");
        registry.clear("Settings");

        assert!(registry.get("Settings").is_none());
        assert_eq!(settings.value, 7);
        assert_eq!(Arc::strong_count(&settings), 1);
    }

    #[test]
    fn test_wrong_type_is_not_returned() {
        let registry = InstanceRegistry::new();
        let settings = Arc::new(Settings { value: 3 });
        publish(&registry, "Settings", &settings).unwrap();
        assert!(registry.get_as::<String>("Settings").is_none());
    }
}
