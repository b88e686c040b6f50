//! Mock media element for testing.

use std::sync::{Arc, Mutex, PoisonError};

use crate::media::{MediaElement, PlaybackError};

/// A call made by a lazy media controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaCall {
    BeginLoad(String),
    Play,
    Pause,
}

#[derive(Default)]
struct MockMediaState {
    calls: Vec<MediaCall>,
    reject_play: Option<PlaybackError>,
}

/// Mock implementation of the MediaElement trait.
///
/// Clones share their recorded calls, so a test can keep one clone and hand
/// another to the controller.
#[derive(Clone, Default)]
pub struct MockMediaElement {
    state: Arc<Mutex<MockMediaState>>,
}

impl std::fmt::Debug for MockMediaElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockMediaElement")
            .field("calls", &self.calls())
            .finish()
    }
}

impl MockMediaElement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `play` fail with this error.
    pub fn reject_play(&self, error: PlaybackError) {
        self.lock().reject_play = Some(error);
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<MediaCall> {
        self.lock().calls.clone()
    }

    /// Number of `begin_load` calls.
    pub fn load_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, MediaCall::BeginLoad(_)))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockMediaState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MediaElement for MockMediaElement {
    fn begin_load(&mut self, url: &str) {
        self.lock().calls.push(MediaCall::BeginLoad(url.to_string()));
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        let mut state = self.lock();
        state.calls.push(MediaCall::Play);
        match &state.reject_play {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn pause(&mut self) {
        self.lock().calls.push(MediaCall::Pause);
    }
}
