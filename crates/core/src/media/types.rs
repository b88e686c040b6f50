//! Types for lazily loaded media.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of heavy payload behind a catalog record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

/// A single media reference extracted from a catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub url: String,
}

impl MediaRef {
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Image,
            url: url.into(),
        }
    }

    pub fn video(url: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Video,
            url: url.into(),
        }
    }
}

/// Records that may carry media.
pub trait HasMedia {
    /// The one media reference this record displays, if any.
    fn media(&self) -> Option<MediaRef>;
}

/// How long a media element keeps reacting to visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaMode {
    /// Start loading on first visibility, then stop observing.
    OneShot,
    /// Keep observing; play while visible, pause while hidden.
    Continuous,
}

impl MediaMode {
    /// Images load once, videos follow visibility.
    pub fn for_kind(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => MediaMode::OneShot,
            MediaKind::Video => MediaMode::Continuous,
        }
    }
}

/// Load state of one media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaState {
    /// Not visible yet; nothing requested.
    Pending,
    /// Load requested, waiting for the element to report back.
    Loading,
    Loaded,
    /// Terminal. No automatic retry.
    Failed,
}

/// What the host should draw for a media slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaPresentation {
    /// Pulse/spinner placeholder while pending or loading.
    Placeholder,
    /// Per-item error affordance after a failed load.
    Error,
    /// Media ready to show.
    Ready {
        kind: MediaKind,
        url: String,
        opacity: f32,
    },
}

/// Playback start failures reported by a media element.
///
/// These are expected (autoplay policies) and never become an error state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("autoplay rejected: {0}")]
    AutoplayRejected(String),

    #[error("playback unavailable: {0}")]
    Unavailable(String),
}

/// Platform element that actually fetches and displays media.
///
/// The element reports completion through
/// [`MediaCompletion`](super::MediaCompletion): exactly one of `loaded` or
/// `failed` per `begin_load`.
pub trait MediaElement: Send {
    /// Attach the source and start fetching it.
    fn begin_load(&mut self, url: &str);

    /// Start or resume playback (video only).
    fn play(&mut self) -> Result<(), PlaybackError>;

    /// Pause playback (video only).
    fn pause(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_for_kind() {
        assert_eq!(MediaMode::for_kind(MediaKind::Image), MediaMode::OneShot);
        assert_eq!(MediaMode::for_kind(MediaKind::Video), MediaMode::Continuous);
    }

    #[test]
    fn test_presentation_serialization() {
        let json = serde_json::to_string(&MediaPresentation::Ready {
            kind: MediaKind::Image,
            url: "https://picsum.photos/400/300?random=1".to_string(),
            opacity: 1.0,
        })
        .unwrap();
        assert!(json.contains("\"type\":\"ready\""));
        assert!(json.contains("\"kind\":\"image\""));

        assert_eq!(
            serde_json::to_string(&MediaPresentation::Placeholder).unwrap(),
            r#"{"type":"placeholder"}"#
        );
    }
}
