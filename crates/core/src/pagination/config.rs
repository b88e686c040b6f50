//! Pagination configuration.

use serde::{Deserialize, Serialize};

use crate::visibility::ObserverConfig;

/// Configuration for a pagination controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Records per page, including the first one.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default)]
    pub sentinel: SentinelConfig,
}

fn default_page_size() -> usize {
    10
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            sentinel: SentinelConfig::default(),
        }
    }
}

impl PaginationConfig {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Observer settings for the end-of-list sentinel.
///
/// The sentinel is always observed continuously; every field falls back to
/// its own default when a config section sets only some of them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentinelConfig {
    #[serde(default)]
    pub trigger_margin: f32,

    /// The sentinel only needs to nick the viewport.
    #[serde(default = "default_sentinel_threshold")]
    pub visibility_threshold: f32,
}

fn default_sentinel_threshold() -> f32 {
    0.1
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            trigger_margin: 0.0,
            visibility_threshold: default_sentinel_threshold(),
        }
    }
}

impl SentinelConfig {
    pub fn observer(&self) -> ObserverConfig {
        ObserverConfig::default()
            .with_margin(self.trigger_margin)
            .with_threshold(self.visibility_threshold)
            .continuous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PaginationConfig::default();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.sentinel.trigger_margin, 0.0);
        assert_eq!(config.sentinel.visibility_threshold, 0.1);
        assert!(!config.sentinel.observer().one_shot);
    }

    #[test]
    fn test_partial_sentinel_section_keeps_field_defaults() {
        let toml = r#"
page_size = 25

[sentinel]
trigger_margin = 200.0
"#;
        let config: PaginationConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.sentinel.trigger_margin, 200.0);
        assert_eq!(config.sentinel.visibility_threshold, 0.1);
    }

    #[test]
    fn test_observer_carries_sentinel_settings() {
        let sentinel = SentinelConfig {
            trigger_margin: 40.0,
            visibility_threshold: 0.25,
        };
        let observer = sentinel.observer();
        assert_eq!(observer.trigger_margin, 40.0);
        assert_eq!(observer.visibility_threshold, 0.25);
        assert!(!observer.one_shot);
    }
}
