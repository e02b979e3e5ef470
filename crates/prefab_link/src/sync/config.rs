use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Keep the target's own structural data on the outermost node.
    pub skip_top_transform: bool,
    /// Copy display names along with content.
    pub change_names: bool,
    pub use_host_native_apply: bool,
    pub use_host_native_revert: bool,
    /// Zero disables automatic dirty checks.
    pub dirty_checks_per_second: f32,
    pub verbose: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            skip_top_transform: true,
            change_names: true,
            use_host_native_apply: false,
            use_host_native_revert: false,
            dirty_checks_per_second: 1.0,
            verbose: false,
        }
    }
}

impl SyncConfig {
    /// Minimum spacing between automatic dirty checks of one node, or `None`
    /// when automatic checks are disabled.
    pub fn dirty_check_interval(&self) -> Option<Duration> {
        if !self.dirty_checks_per_second.is_finite() || self.dirty_checks_per_second <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f32(1.0 / self.dirty_checks_per_second))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_disables_automatic_checks() {
        let config = SyncConfig {
            dirty_checks_per_second: 0.0,
            ..SyncConfig::default()
        };
        assert_eq!(config.dirty_check_interval(), None);
    }

    #[test]
    fn rate_maps_to_interval() {
        let config = SyncConfig {
            dirty_checks_per_second: 4.0,
            ..SyncConfig::default()
        };
        assert_eq!(config.dirty_check_interval(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: SyncConfig =
            serde_json::from_str(r#"{ "change_names": false }"#).expect("config");
        assert!(!config.change_names);
        assert!(config.skip_top_transform);
        assert_eq!(config.dirty_checks_per_second, 1.0);
    }
}
