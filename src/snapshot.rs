//! Serializable view of an orchestrator for diagnostics

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum_macros::Display;
use uuid::Uuid;

use crate::registry::{Descriptor, EntryState, Kind, RegistryEntry};

/// Where the orchestrator is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Accepting registrations
    Idle,
    Starting,
    /// Startup completed; instances are live
    Running,
    /// Startup aborted; whatever was constructed stays alive
    Failed,
    Stopping,
    Stopped,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntrySnapshot {
    pub name: String,
    pub kind: Kind,
    pub state: EntryState,
    pub dependencies: Vec<String>,
    pub optional_dependencies: Vec<String>,
    pub requires_gui: bool,
}

impl EntrySnapshot {
    pub(crate) fn pending(descriptor: &Descriptor) -> Self {
        Self {
            name: descriptor.name().to_string(),
            kind: descriptor.kind(),
            state: EntryState::Unconstructed,
            dependencies: descriptor.dependencies().to_vec(),
            optional_dependencies: descriptor.optional_dependencies().to_vec(),
            requires_gui: descriptor.gui_required(),
        }
    }

    pub(crate) fn of(entry: &RegistryEntry) -> Self {
        Self {
            name: entry.type_name().to_string(),
            kind: entry.kind(),
            state: entry.state(),
            dependencies: entry.dependencies().to_vec(),
            optional_dependencies: entry.optional_dependencies().to_vec(),
            requires_gui: entry.requires_gui(),
        }
    }
}

/// Point-in-time description of a run
///
/// Before start, `entries` lists registrations in registration order; once
/// a run has resolved, it lists them in resolved order.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub run_id: Option<Uuid>,
    pub phase: RunPhase,
    pub graphical: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    /// Entries removed because the run is headless
    pub dropped: Vec<String>,
    pub entries: Vec<EntrySnapshot>,
    /// Why startup failed, if it did
    pub error: Option<String>,
}

impl Snapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn entry(&self, name: &str) -> Option<&EntrySnapshot> {
        self.entries.iter().find(|e| e.name == name)
    }
}
