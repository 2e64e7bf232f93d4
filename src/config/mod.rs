use dashmap::DashMap;
use serde::Deserialize;
use std::env;
use std::sync::Arc;

/// Forces the graphical environment on or off when set to a boolean value
pub const GRAPHICAL_VAR: &str = "KEYSTONE_GRAPHICAL";
/// Forces a headless run when set to a truthy value
pub const HEADLESS_VAR: &str = "KEYSTONE_HEADLESS";

/// Key/value snapshot of the process environment
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// Snapshot the current process environment
    pub fn from_env() -> Self {
        let service = Self::default();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    /// Build from explicit pairs, ignoring the process environment
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let service = Self::default();
        for (key, value) in pairs {
            service.set(key.as_ref(), value.as_ref());
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    /// Parse `key` as a boolean flag (`1/0`, `true/false`, `yes/no`, `on/off`)
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        let value = self.get(key)?;
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            other => {
                tracing::warn!("Ignoring {}={:?}: not a boolean", key, other);
                None
            }
        }
    }

    /// `true` if `key` is set to a non-empty value
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.trim().is_empty())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }
}

/// Orchestrator settings
///
/// Deserializable so hosts can embed it in their own configuration files;
/// unset fields are resolved from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Override graphical-environment detection
    pub graphical: Option<bool>,
}

impl OrchestratorConfig {
    /// Settings with detection left to the process environment
    pub fn from_env() -> Self {
        Self::from_config(&ConfigService::from_env())
    }

    pub fn from_config(config: &ConfigService) -> Self {
        Self {
            graphical: Some(detect_graphical(config)),
        }
    }

    pub fn headless() -> Self {
        Self {
            graphical: Some(false),
        }
    }

    pub fn graphical() -> Self {
        Self {
            graphical: Some(true),
        }
    }

    /// Whether this run has a graphical environment
    pub fn is_graphical(&self) -> bool {
        match self.graphical {
            Some(graphical) => graphical,
            None => detect_graphical(&ConfigService::from_env()),
        }
    }
}

/// Explicit overrides first, then display server variables
fn detect_graphical(config: &ConfigService) -> bool {
    if let Some(graphical) = config.get_bool(GRAPHICAL_VAR) {
        return graphical;
    }
    if config.get_bool(HEADLESS_VAR) == Some(true) {
        return false;
    }
    if cfg!(any(target_os = "macos", target_os = "windows")) {
        return true;
    }
    config.is_set("DISPLAY") || config.is_set("WAYLAND_DISPLAY")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_means_graphical() {
        let config = ConfigService::from_pairs([("DISPLAY", ":0")]);
        assert!(OrchestratorConfig::from_config(&config).is_graphical());
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    #[test]
    fn test_no_display_means_headless() {
        let config = ConfigService::from_pairs([("DISPLAY", "")]);
        assert!(!OrchestratorConfig::from_config(&config).is_graphical());
    }

    #[test]
    fn test_overrides_win_over_detection() {
        let config = ConfigService::from_pairs([("WAYLAND_DISPLAY", "wayland-0"), (HEADLESS_VAR, "1")]);
        assert!(!OrchestratorConfig::from_config(&config).is_graphical());

        let config = ConfigService::from_pairs([(GRAPHICAL_VAR, "yes")]);
        assert!(OrchestratorConfig::from_config(&config).is_graphical());
    }

    #[test]
    fn test_bool_parsing() {
        let config = ConfigService::from_pairs([("A", "On"), ("B", "0"), ("C", "maybe")]);
        assert_eq!(config.get_bool("A"), Some(true));
        assert_eq!(config.get_bool("B"), Some(false));
        assert_eq!(config.get_bool("C"), None);
        assert_eq!(config.get_bool("D"), None);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: OrchestratorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, OrchestratorConfig::default());
        let config: OrchestratorConfig = serde_json::from_str(r#"{"graphical": false}"#).unwrap();
        assert!(!config.is_graphical());
    }
}
