//! Media observer configuration.

use serde::{Deserialize, Serialize};

use super::MediaKind;
use crate::visibility::ObserverConfig;

/// Visibility settings for lazily loaded media.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Distance outside the viewport at which images start loading.
    #[serde(default = "default_trigger_margin")]
    pub trigger_margin: f32,

    /// Fraction of an image that must be inside the grown viewport.
    /// 0.0 means any overlap.
    #[serde(default)]
    pub visibility_threshold: f32,

    /// Fraction of a video that must be visible for it to play.
    #[serde(default = "default_video_threshold")]
    pub video_visibility_threshold: f32,
}

fn default_trigger_margin() -> f32 {
    50.0
}

fn default_video_threshold() -> f32 {
    0.5
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            trigger_margin: default_trigger_margin(),
            visibility_threshold: 0.0,
            video_visibility_threshold: default_video_threshold(),
        }
    }
}

impl MediaConfig {
    /// Observer settings for a media element of the given kind.
    pub fn observer_for(&self, kind: MediaKind) -> ObserverConfig {
        match kind {
            MediaKind::Image => ObserverConfig::default()
                .with_margin(self.trigger_margin)
                .with_threshold(self.visibility_threshold)
                .one_shot(),
            MediaKind::Video => ObserverConfig::default()
                .with_threshold(self.video_visibility_threshold)
                .continuous(),
        }
    }
}
