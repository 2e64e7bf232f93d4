//! Test helpers for Keystone
//!
//! [`Recorder`] collects every lifecycle call made on probe entries, so a
//! test can assert on the exact order the orchestrator used:
//!
//! ```
//! use keystone::{Orchestrator, OrchestratorConfig};
//! use keystone_testing::{Call, Recorder, probe};
//!
//! let recorder = Recorder::new();
//! let orchestrator = Orchestrator::new().with_config(OrchestratorConfig::headless());
//! orchestrator.register(probe::component("Config", &recorder)).unwrap();
//! orchestrator
//!     .register(probe::singleton("Service", &recorder).depends_on(["Config"]))
//!     .unwrap();
//!
//! orchestrator.start().unwrap();
//! assert_eq!(recorder.names(Call::Construct), ["Config", "Service"]);
//! ```

pub mod probe;

use std::sync::{Arc, Mutex, MutexGuard, Once, PoisonError};

use strum_macros::Display;

pub use probe::Probe;

/// A lifecycle call observed on a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Call {
    /// A probe singleton was built, or a probe component ran `init`
    Construct,
    PostInit,
    PreDestroy,
    /// A probe singleton was dropped, or a probe component ran `deinit`
    Destroy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub call: Call,
}

/// Ordered log of lifecycle calls, shared between probes and the test
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn events_mut(&self) -> MutexGuard<'_, Vec<Event>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, name: &str, call: Call) {
        self.events_mut().push(Event {
            name: name.to_string(),
            call,
        });
    }

    /// Every event, in the order it happened
    pub fn events(&self) -> Vec<Event> {
        self.events_mut().clone()
    }

    /// Every event as `"call:name"`, handy for whole-sequence assertions
    pub fn trace(&self) -> Vec<String> {
        self.events_mut()
            .iter()
            .map(|e| format!("{}:{}", e.call, e.name))
            .collect()
    }

    /// Names that received `call`, in order
    pub fn names(&self, call: Call) -> Vec<String> {
        self.events_mut()
            .iter()
            .filter(|e| e.call == call)
            .map(|e| e.name.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events_mut().is_empty()
    }

    pub fn clear(&self) {
        self.events_mut().clear();
    }
}

/// Install a test-friendly `tracing` subscriber once per process
///
/// Honours `RUST_LOG`; defaults to `keystone=debug`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("keystone=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
