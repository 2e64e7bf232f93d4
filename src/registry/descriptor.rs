use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use strum_macros::Display;

use super::Declared;
use crate::error::{KeystoneError, Result};
use crate::lifecycle::{Component, Lifecycle, LifecycleError, Singleton};

/// Erased factory producing a freshly constructed singleton.
pub(crate) type Factory =
    Arc<dyn Fn() -> std::result::Result<Constructed, LifecycleError> + Send + Sync>;

/// Erased static hook of a component.
pub(crate) type Hook = Arc<dyn Fn() -> std::result::Result<(), LifecycleError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Singleton,
    Component,
}

/// A live singleton, viewed both as a lookup target and as a lifecycle
/// participant. Both handles point at the same allocation.
#[derive(Clone)]
pub(crate) struct Constructed {
    pub(crate) object: Arc<dyn Any + Send + Sync>,
    pub(crate) hooks: Arc<dyn Lifecycle>,
}

pub(crate) enum Blueprint {
    Singleton { factory: Factory },
    Component { init: Option<Hook>, deinit: Option<Hook> },
}

/// Registration record for one type
///
/// This is the explicit form of what `#[derive(Declare)]` generates; use it
/// directly when the set of types is only known at runtime.
///
/// # Example
/// ```
/// use keystone::{Descriptor, Orchestrator};
///
/// let orchestrator = Orchestrator::new();
/// orchestrator
///     .register(Descriptor::component("Config").init(|| Ok(())))
///     .unwrap();
/// orchestrator
///     .register(
///         Descriptor::component("Logger")
///             .depends_on(["Config"])
///             .deinit(|| Ok(())),
///     )
///     .unwrap();
/// ```
pub struct Descriptor {
    name: String,
    dependencies: Vec<String>,
    optional_dependencies: Vec<String>,
    requires_gui: bool,
    blueprint: Blueprint,
    misuse: Option<&'static str>,
}

impl Descriptor {
    /// Describe a singleton built by `factory`
    pub fn singleton<T, F>(name: impl Into<String>, factory: F) -> Self
    where
        T: Lifecycle + 'static,
        F: Fn() -> std::result::Result<T, LifecycleError> + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move || {
            let instance = Arc::new(factory()?);
            Ok(Constructed {
                object: Arc::clone(&instance) as Arc<dyn Any + Send + Sync>,
                hooks: instance,
            })
        });
        Self::with_blueprint(name.into(), Blueprint::Singleton { factory })
    }

    /// Describe a component; attach hooks with [`init`](Self::init) and
    /// [`deinit`](Self::deinit)
    pub fn component(name: impl Into<String>) -> Self {
        Self::with_blueprint(
            name.into(),
            Blueprint::Component {
                init: None,
                deinit: None,
            },
        )
    }

    /// Descriptor for a [`Singleton`] type, read from its declared metadata
    pub fn of_singleton<T: Singleton>() -> Self {
        Self::singleton(T::TYPE_NAME, T::construct).declared_by::<T>()
    }

    /// Descriptor for a [`Component`] type, read from its declared metadata
    pub fn of_component<T: Component>() -> Self {
        let mut descriptor = Self::component(T::TYPE_NAME).declared_by::<T>();
        if let Some(init) = T::INIT {
            descriptor = descriptor.init(init);
        }
        if let Some(deinit) = T::DEINIT {
            descriptor = descriptor.deinit(deinit);
        }
        descriptor
    }

    fn with_blueprint(name: String, blueprint: Blueprint) -> Self {
        Self {
            name,
            dependencies: Vec::new(),
            optional_dependencies: Vec::new(),
            requires_gui: false,
            blueprint,
            misuse: None,
        }
    }

    fn declared_by<T: Declared>(self) -> Self {
        self.depends_on(T::DEPENDENCIES.iter().copied())
            .optionally_depends_on(T::OPTIONAL_DEPENDENCIES.iter().copied())
            .requires_gui(T::REQUIRES_GUI)
    }

    /// Add hard dependencies; repeated names are kept once
    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        extend_unique(&mut self.dependencies, dependencies);
        self
    }

    /// Add optional dependencies; repeated names are kept once
    pub fn optionally_depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        extend_unique(&mut self.optional_dependencies, dependencies);
        self
    }

    pub fn requires_gui(mut self, requires_gui: bool) -> Self {
        self.requires_gui = requires_gui;
        self
    }

    /// Static hook run during the construct pass (components only)
    pub fn init<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> std::result::Result<(), LifecycleError> + Send + Sync + 'static,
    {
        match &mut self.blueprint {
            Blueprint::Component { init, .. } => *init = Some(Arc::new(hook)),
            Blueprint::Singleton { .. } => {
                self.misuse = Some("singletons take post_init, not a static init hook")
            }
        }
        self
    }

    /// Static hook run during the destroy pass (components only)
    pub fn deinit<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> std::result::Result<(), LifecycleError> + Send + Sync + 'static,
    {
        match &mut self.blueprint {
            Blueprint::Component { deinit, .. } => *deinit = Some(Arc::new(hook)),
            Blueprint::Singleton { .. } => {
                self.misuse = Some("singletons take pre_destroy, not a static deinit hook")
            }
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> Kind {
        match self.blueprint {
            Blueprint::Singleton { .. } => Kind::Singleton,
            Blueprint::Component { .. } => Kind::Component,
        }
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn optional_dependencies(&self) -> &[String] {
        &self.optional_dependencies
    }

    pub fn gui_required(&self) -> bool {
        self.requires_gui
    }

    pub(crate) fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    /// Check the shape requirements a registration must meet
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(KeystoneError::invalid_descriptor(
                "<unnamed>",
                "type name must not be empty",
            ));
        }
        if let Some(reason) = self.misuse {
            return Err(KeystoneError::invalid_descriptor(&self.name, reason));
        }
        if let Blueprint::Component {
            init: None,
            deinit: None,
        } = self.blueprint
        {
            return Err(KeystoneError::invalid_descriptor(
                &self.name,
                "a component must provide an init or a deinit hook",
            ));
        }
        let blank = self
            .dependencies
            .iter()
            .chain(&self.optional_dependencies)
            .any(|dep| dep.trim().is_empty());
        if blank {
            return Err(KeystoneError::invalid_descriptor(
                &self.name,
                "dependency names must not be empty",
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("dependencies", &self.dependencies)
            .field("optional_dependencies", &self.optional_dependencies)
            .field("requires_gui", &self.requires_gui)
            .finish_non_exhaustive()
    }
}

fn extend_unique<I, S>(target: &mut Vec<String>, items: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    for item in items {
        let item = item.into();
        if !target.contains(&item) {
            target.push(item);
        }
    }
}
