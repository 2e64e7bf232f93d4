use std::fmt;

use thiserror::Error;

use crate::lifecycle::Phase;

pub type Result<T> = std::result::Result<T, KeystoneError>;

#[derive(Debug, Error)]
pub enum KeystoneError {
    #[error("Invalid descriptor for {type_name}: {reason}")]
    InvalidDescriptor { type_name: String, reason: String },

    #[error("Type already registered: {type_name}")]
    DuplicateRegistration { type_name: String },

    #[error("Registration of {type_name} rejected: the orchestrator has already started")]
    RegistrationClosed { type_name: String },

    #[error("Missing dependency: {type_name} depends on {dependency}, which is not registered")]
    MissingDependency {
        type_name: String,
        dependency: String,
    },

    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    #[error("Construction of {type_name} failed: {message}")]
    ConstructionFailed { type_name: String, message: String },

    #[error("Post-init of {type_name} failed: {message}")]
    PostInitFailed { type_name: String, message: String },

    #[error("Instance slot for {type_name} is already occupied by a live instance")]
    SlotOccupied { type_name: String },

    #[error("Orchestrator has already been started")]
    AlreadyStarted,

    #[error("Orchestrator is not running")]
    NotStarted,

    #[error("Shutdown finished with {} failure(s): {}", failures.len(), summarize(failures))]
    ShutdownFailed { failures: Vec<ShutdownFailure> },
}

impl KeystoneError {
    pub fn invalid_descriptor(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_dependency(type_name: impl Into<String>, dependency: impl Into<String>) -> Self {
        Self::MissingDependency {
            type_name: type_name.into(),
            dependency: dependency.into(),
        }
    }

    pub fn construction_failed(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConstructionFailed {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    pub fn post_init_failed(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PostInitFailed {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Configuration errors come from bad declarative metadata and are
    /// fixed by editing registrations, not by retrying.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidDescriptor { .. }
                | Self::DuplicateRegistration { .. }
                | Self::RegistrationClosed { .. }
                | Self::MissingDependency { .. }
                | Self::CircularDependency { .. }
                | Self::SlotOccupied { .. }
        )
    }
}

/// One entry that failed during a shutdown pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownFailure {
    pub type_name: String,
    pub phase: Phase,
    pub message: String,
}

impl fmt::Display for ShutdownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} during {}: {}", self.type_name, self.phase, self.message)
    }
}

fn summarize(failures: &[ShutdownFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
