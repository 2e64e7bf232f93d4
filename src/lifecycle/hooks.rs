//! Process lifecycle hooks
//!
//! The first registration arms a one-shot start action and a one-shot stop
//! action. The host fires them around its main loop: start once the loop is
//! running, stop at exit. Each fires at most once per hook set, and stop
//! only after start.

use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct HookState {
    armed: bool,
    arm_count: usize,
    start_fired: bool,
    stop_fired: bool,
}

/// One-shot start/stop hooks shared by the registrar and the host
#[derive(Default)]
pub struct ProcessHooks {
    state: Mutex<HookState>,
}

impl ProcessHooks {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, HookState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arm the hooks; returns `true` only for the call that armed them
    pub fn arm(&self) -> bool {
        let mut state = self.state();
        if state.armed {
            return false;
        }
        state.armed = true;
        state.arm_count += 1;
        tracing::debug!("Armed process start/stop hooks");
        true
    }

    pub fn is_armed(&self) -> bool {
        self.state().armed
    }

    /// How many times arming actually took effect (0 or 1)
    pub fn arm_count(&self) -> usize {
        self.state().arm_count
    }

    /// Run `start` if the hooks are armed and start has not fired yet
    pub fn fire_start<R>(&self, start: impl FnOnce() -> R) -> Option<R> {
        {
            let mut state = self.state();
            if !state.armed || state.start_fired {
                return None;
            }
            state.start_fired = true;
        }
        Some(start())
    }

    /// Run `stop` if start has fired and stop has not
    pub fn fire_stop<R>(&self, stop: impl FnOnce() -> R) -> Option<R> {
        {
            let mut state = self.state();
            if !state.start_fired || state.stop_fired {
                return None;
            }
            state.stop_fired = true;
        }
        Some(stop())
    }

    pub fn start_fired(&self) -> bool {
        self.state().start_fired
    }

    pub fn stop_fired(&self) -> bool {
        self.state().stop_fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unarmed_hooks_never_fire() {
        let hooks = ProcessHooks::new();
        assert_eq!(hooks.fire_start(|| 1), None);
        assert_eq!(hooks.fire_stop(|| 2), None);
    }

    #[test]
    fn test_arm_is_idempotent() {
        let hooks = ProcessHooks::new();
        assert!(hooks.arm());
        assert!(!hooks.arm());
        assert!(!hooks.arm());
        assert_eq!(hooks.arm_count(), 1);
    }

    #[test]
    fn test_start_then_stop_fire_once_each() {
        let hooks = ProcessHooks::new();
        hooks.arm();
        assert_eq!(hooks.fire_stop(|| "stop"), None);
        assert_eq!(hooks.fire_start(|| "start"), Some("start"));
        assert_eq!(hooks.fire_start(|| "start"), None);
        assert_eq!(hooks.fire_stop(|| "stop"), Some("stop"));
        assert_eq!(hooks.fire_stop(|| "stop"), None);
        assert!(hooks.start_fired());
        assert!(hooks.stop_fired());
    }
}
