//! Visibility-gated media controller.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, warn};

use super::{
    MediaConfig, MediaElement, MediaKind, MediaMode, MediaPresentation, MediaRef, MediaState,
};
use crate::visibility::{ElementId, Subscription, VisibilityTracker};

type Hook = Box<dyn FnMut() + Send>;

/// Side effects requested from the host element, run outside the state lock.
#[derive(Debug)]
enum HostAction {
    BeginLoad(String),
    Play,
    Pause,
}

#[derive(Debug, Clone, Copy)]
enum Completion {
    Loaded,
    Failed,
}

struct MediaInner {
    media: MediaRef,
    mode: MediaMode,
    state: MediaState,
    is_visible: bool,
    is_playing: bool,
    detached: bool,
    on_load: Option<Hook>,
    on_error: Option<Hook>,
}

impl MediaInner {
    fn on_visibility(&mut self, visible: bool) -> Vec<HostAction> {
        self.is_visible = visible;
        let continuous = self.mode == MediaMode::Continuous;

        match (self.state, visible) {
            (MediaState::Pending, true) => {
                self.state = MediaState::Loading;
                debug!(url = %self.media.url, kind = ?self.media.kind, "Media visible, starting load");
                let mut actions = vec![HostAction::BeginLoad(self.media.url.clone())];
                if continuous {
                    actions.push(HostAction::Play);
                }
                actions
            }
            (MediaState::Loading | MediaState::Loaded, true) if continuous && !self.is_playing => {
                vec![HostAction::Play]
            }
            (MediaState::Loading | MediaState::Loaded, false) if continuous && self.is_playing => {
                self.is_playing = false;
                vec![HostAction::Pause]
            }
            _ => Vec::new(),
        }
    }
}

struct MediaShared {
    inner: Mutex<MediaInner>,
    host: Mutex<Box<dyn MediaElement>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MediaShared {
    fn handle_visibility(&self, visible: bool) {
        let actions = {
            let mut inner = lock(&self.inner);
            if inner.detached {
                return;
            }
            inner.on_visibility(visible)
        };
        self.run(actions);
    }

    fn run(&self, actions: Vec<HostAction>) {
        for action in actions {
            match action {
                HostAction::BeginLoad(url) => lock(&self.host).begin_load(&url),
                HostAction::Play => {
                    let result = lock(&self.host).play();
                    match result {
                        Ok(()) => {
                            let mut inner = lock(&self.inner);
                            inner.is_playing = inner.is_visible && !inner.detached;
                        }
                        Err(e) => {
                            // Autoplay policies reject this routinely.
                            debug!(error = %e, "Playback start rejected, ignoring");
                        }
                    }
                }
                HostAction::Pause => lock(&self.host).pause(),
            }
        }
    }

    fn complete(&self, completion: Completion) {
        let hook = {
            let mut inner = lock(&self.inner);
            if inner.detached || inner.state != MediaState::Loading {
                debug!(
                    url = %inner.media.url,
                    state = ?inner.state,
                    ?completion,
                    "Ignoring media completion outside loading state"
                );
                return;
            }
            match completion {
                Completion::Loaded => {
                    inner.state = MediaState::Loaded;
                    debug!(url = %inner.media.url, "Media loaded");
                    inner.on_load.take()
                }
                Completion::Failed => {
                    inner.state = MediaState::Failed;
                    inner.is_playing = false;
                    warn!(url = %inner.media.url, "Media failed to load");
                    inner.on_error.take()
                }
            }
        };

        if let Some(mut hook) = hook {
            hook();
        }
    }
}

/// Handle the host element uses to report load completion.
///
/// Cheap to clone. Reports arriving after the controller was detached or
/// dropped are ignored.
#[derive(Clone)]
pub struct MediaCompletion {
    shared: Weak<MediaShared>,
}

impl fmt::Debug for MediaCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaCompletion")
            .field("attached", &(self.shared.strong_count() > 0))
            .finish()
    }
}

impl MediaCompletion {
    pub fn loaded(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.complete(Completion::Loaded);
        }
    }

    pub fn failed(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.complete(Completion::Failed);
        }
    }
}

/// Builder for [`LazyMedia`].
pub struct LazyMediaBuilder {
    media: MediaRef,
    mode: MediaMode,
    on_load: Option<Hook>,
    on_error: Option<Hook>,
}

impl fmt::Debug for LazyMediaBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyMediaBuilder")
            .field("media", &self.media)
            .field("mode", &self.mode)
            .finish()
    }
}

impl LazyMediaBuilder {
    /// Override the mode derived from the media kind.
    pub fn mode(mut self, mode: MediaMode) -> Self {
        self.mode = mode;
        self
    }

    /// Called once when the element finishes loading (e.g. to fade in).
    pub fn on_load<F>(mut self, hook: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.on_load = Some(Box::new(hook));
        self
    }

    /// Called once when the element fails to load.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.on_error = Some(Box::new(hook));
        self
    }

    /// Register the visibility observer and hand over the host element.
    ///
    /// If the element is already visible, loading starts before this
    /// returns.
    pub fn attach(
        self,
        tracker: &VisibilityTracker,
        element: ElementId,
        config: &MediaConfig,
        host: Box<dyn MediaElement>,
    ) -> LazyMedia {
        let mut observer = config.observer_for(self.media.kind);
        observer.one_shot = self.mode == MediaMode::OneShot;

        let shared = Arc::new(MediaShared {
            inner: Mutex::new(MediaInner {
                media: self.media,
                mode: self.mode,
                state: MediaState::Pending,
                is_visible: false,
                is_playing: false,
                detached: false,
                on_load: self.on_load,
                on_error: self.on_error,
            }),
            host: Mutex::new(host),
        });

        let weak = Arc::downgrade(&shared);
        let subscription = tracker.observe(element, observer, move |visible| {
            if let Some(shared) = weak.upgrade() {
                shared.handle_visibility(visible);
            }
        });

        LazyMedia {
            shared,
            subscription,
        }
    }
}

/// Per-item controller that starts a heavy media load only once its element
/// becomes visible.
///
/// Images observe once and stop; videos keep observing and pause/resume
/// playback as they leave and re-enter the viewport. Dropping the controller
/// disposes its observer.
pub struct LazyMedia {
    shared: Arc<MediaShared>,
    subscription: Subscription,
}

impl fmt::Debug for LazyMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = lock(&self.shared.inner);
        f.debug_struct("LazyMedia")
            .field("media", &inner.media)
            .field("mode", &inner.mode)
            .field("state", &inner.state)
            .field("is_visible", &inner.is_visible)
            .field("is_playing", &inner.is_playing)
            .finish()
    }
}

impl LazyMedia {
    /// Start building a controller; the mode defaults from the media kind.
    pub fn builder(media: MediaRef) -> LazyMediaBuilder {
        let mode = MediaMode::for_kind(media.kind);
        LazyMediaBuilder {
            media,
            mode,
            on_load: None,
            on_error: None,
        }
    }

    /// Attach with the default mode for the media kind and no hooks.
    pub fn attach(
        tracker: &VisibilityTracker,
        element: ElementId,
        media: MediaRef,
        config: &MediaConfig,
        host: Box<dyn MediaElement>,
    ) -> Self {
        Self::builder(media).attach(tracker, element, config, host)
    }

    pub fn state(&self) -> MediaState {
        lock(&self.shared.inner).state
    }

    pub fn is_visible(&self) -> bool {
        lock(&self.shared.inner).is_visible
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.shared.inner).is_playing
    }

    pub fn mode(&self) -> MediaMode {
        lock(&self.shared.inner).mode
    }

    pub fn media(&self) -> MediaRef {
        lock(&self.shared.inner).media.clone()
    }

    /// Whether the visibility observer is still registered.
    pub fn is_observing(&self) -> bool {
        self.subscription.is_active()
    }

    /// What the host should draw right now.
    pub fn presentation(&self) -> MediaPresentation {
        let inner = lock(&self.shared.inner);
        match inner.state {
            MediaState::Pending | MediaState::Loading => MediaPresentation::Placeholder,
            MediaState::Failed => MediaPresentation::Error,
            MediaState::Loaded => MediaPresentation::Ready {
                kind: inner.media.kind,
                url: inner.media.url.clone(),
                opacity: 1.0,
            },
        }
    }

    /// Completion handle for the host element.
    pub fn completion(&self) -> MediaCompletion {
        MediaCompletion {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// The element finished loading.
    pub fn on_load(&self) {
        self.shared.complete(Completion::Loaded);
    }

    /// The element failed to load.
    pub fn on_error(&self) {
        self.shared.complete(Completion::Failed);
    }

    /// Stop observing and ignore any later completion.
    pub fn detach(&mut self) {
        self.subscription.dispose();
        let mut inner = lock(&self.shared.inner);
        if !inner.detached {
            inner.detached = true;
            inner.is_playing = false;
        }
    }

    pub fn kind(&self) -> MediaKind {
        lock(&self.shared.inner).media.kind
    }
}

impl Drop for LazyMedia {
    fn drop(&mut self) {
        self.detach();
    }
}
