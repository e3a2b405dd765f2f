//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Tunables for one [`Engine`](crate::Engine).
///
/// Every field has a default, so a partial document deserializes cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How many times a single job may re-run within one `flush_jobs` call.
    pub recursion_limit: usize,

    /// Store and cache size at which dropped objects are swept out.
    pub sweep_threshold: usize,

    /// Log a warning when a readonly wrapper refuses a write.
    pub warn_on_readonly: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recursion_limit: 100,
            sweep_threshold: 64,
            warn_on_readonly: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{ "recursion_limit": 5 }"#).unwrap();
        assert_eq!(config.recursion_limit, 5);
        assert_eq!(config.sweep_threshold, 64);
        assert!(config.warn_on_readonly);
    }
}
