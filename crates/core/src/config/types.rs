use serde::{Deserialize, Serialize};

pub use crate::media::MediaConfig;
pub use crate::pagination::PaginationConfig;
pub use crate::view::ViewConfig;

/// Root configuration
///
/// Every section has defaults, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub mock: MockConfig,
    #[serde(default)]
    pub view: ViewConfig,
}

/// Mock room generator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MockConfig {
    /// Total rooms the mock source serves before running dry.
    #[serde(default = "default_room_count")]
    pub room_count: usize,

    /// Simulated latency per page fetch.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,

    /// Generator seed. Unset means a fresh catalog every run.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Probability that a page fetch fails, in 0.0..=1.0.
    #[serde(default)]
    pub failure_rate: f64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            room_count: default_room_count(),
            latency_ms: default_latency_ms(),
            seed: None,
            failure_rate: 0.0,
        }
    }
}

fn default_room_count() -> usize {
    100
}

fn default_latency_ms() -> u64 {
    1000
}
