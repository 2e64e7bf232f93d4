//! Probe singletons and components that report to a [`Recorder`]

use std::sync::Arc;

use keystone::{Descriptor, Lifecycle, LifecycleError};

use crate::{Call, Recorder};

/// Singleton instance built by [`singleton`] and [`failing_singleton`]
///
/// Records `Destroy` when dropped, so a test sees the instance actually go
/// away rather than just its slot being cleared.
pub struct Probe {
    name: String,
    recorder: Arc<Recorder>,
    fail_at: Option<Call>,
}

impl Probe {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn hook(&self, call: Call) -> Result<(), LifecycleError> {
        self.recorder.record(&self.name, call);
        if self.fail_at == Some(call) {
            return Err(failure(&self.name, call));
        }
        Ok(())
    }
}

impl Lifecycle for Probe {
    fn post_init(&self) -> Result<(), LifecycleError> {
        self.hook(Call::PostInit)
    }

    fn pre_destroy(&self) -> Result<(), LifecycleError> {
        self.hook(Call::PreDestroy)
    }
}

impl Drop for Probe {
    fn drop(&mut self) {
        self.recorder.record(&self.name, Call::Destroy);
    }
}

fn failure(name: &str, call: Call) -> LifecycleError {
    match call {
        Call::Construct | Call::PostInit => {
            LifecycleError::init_failed(format!("{name} failed on purpose during {call}"))
        }
        Call::PreDestroy | Call::Destroy => {
            LifecycleError::shutdown_failed(format!("{name} failed on purpose during {call}"))
        }
    }
}

/// Singleton descriptor whose instance records every lifecycle call
pub fn singleton(name: &str, recorder: &Arc<Recorder>) -> Descriptor {
    build_singleton(name, recorder, None)
}

/// Like [`singleton`], but the hook for `fail_at` returns an error
///
/// `Call::Construct` makes the factory fail; `Call::Destroy` cannot fail
/// for a singleton and behaves like [`singleton`].
pub fn failing_singleton(name: &str, recorder: &Arc<Recorder>, fail_at: Call) -> Descriptor {
    build_singleton(name, recorder, Some(fail_at))
}

fn build_singleton(name: &str, recorder: &Arc<Recorder>, fail_at: Option<Call>) -> Descriptor {
    let owned = name.to_string();
    let recorder = Arc::clone(recorder);
    Descriptor::singleton(name, move || {
        if fail_at == Some(Call::Construct) {
            return Err(failure(&owned, Call::Construct));
        }
        recorder.record(&owned, Call::Construct);
        Ok(Probe {
            name: owned.clone(),
            recorder: Arc::clone(&recorder),
            fail_at,
        })
    })
}

/// Component descriptor with `init` and `deinit` hooks that record calls
pub fn component(name: &str, recorder: &Arc<Recorder>) -> Descriptor {
    build_component(name, recorder, None)
}

/// Like [`component`], but `init` (`Call::Construct`) or `deinit`
/// (`Call::Destroy`) returns an error after recording
pub fn failing_component(name: &str, recorder: &Arc<Recorder>, fail_at: Call) -> Descriptor {
    build_component(name, recorder, Some(fail_at))
}

fn build_component(name: &str, recorder: &Arc<Recorder>, fail_at: Option<Call>) -> Descriptor {
    let hook = |call: Call| {
        let owned = name.to_string();
        let recorder = Arc::clone(recorder);
        move || {
            recorder.record(&owned, call);
            if fail_at == Some(call) {
                return Err(failure(&owned, call));
            }
            Ok(())
        }
    };
    Descriptor::component(name)
        .init(hook(Call::Construct))
        .deinit(hook(Call::Destroy))
}
