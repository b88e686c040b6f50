//! Viewport visibility tracking.
//!
//! [`VisibilityTracker`] is the host's visibility-detection primitive. The
//! host pushes geometry into it (viewport, scroll offset, element bounds) and
//! every observer whose element crosses its threshold gets a callback. There
//! is no polling: callbacks only fire from the geometry-changing calls and
//! from [`VisibilityTracker::observe`] itself.
//!
//! Each `observe` call returns a [`Subscription`]. Dropping or disposing it
//! releases the observer, so an owner that goes away for any reason stops
//! receiving callbacks.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::geometry::Rect;

/// Host-assigned identifier of an observable element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId(pub u64);

/// Identifier of one observer registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// How an observer decides that its element is visible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObserverConfig {
    /// Distance by which the viewport is grown on every side before testing.
    #[serde(default)]
    pub trigger_margin: f32,
    /// Fraction of the element (0.0-1.0) that must overlap the grown
    /// viewport. 0.0 means any overlap.
    #[serde(default)]
    pub visibility_threshold: f32,
    /// Dispose automatically after the first transition to visible.
    #[serde(default)]
    pub one_shot: bool,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            trigger_margin: 0.0,
            visibility_threshold: 0.0,
            one_shot: false,
        }
    }
}

impl ObserverConfig {
    pub fn with_margin(mut self, trigger_margin: f32) -> Self {
        self.trigger_margin = trigger_margin;
        self
    }

    pub fn with_threshold(mut self, visibility_threshold: f32) -> Self {
        self.visibility_threshold = visibility_threshold;
        self
    }

    pub fn one_shot(mut self) -> Self {
        self.one_shot = true;
        self
    }

    pub fn continuous(mut self) -> Self {
        self.one_shot = false;
        self
    }

    /// Whether `element` counts as visible inside `viewport`.
    ///
    /// Zero-area elements (markers) are visible when they touch the grown
    /// viewport at all; everything else needs a positive overlap covering at
    /// least `visibility_threshold` of the element.
    pub fn is_visible(&self, element: &Rect, viewport: &Rect) -> bool {
        let root = viewport.expand(self.trigger_margin);

        if element.area() <= 0.0 {
            return element.intersection(&root).is_some();
        }

        match element.intersection(&root) {
            Some(overlap) if overlap.area() > 0.0 => {
                element.coverage_by(&root) >= self.visibility_threshold
            }
            _ => false,
        }
    }
}

type VisibilityCallback = Arc<dyn Fn(bool) + Send + Sync>;

struct Observer {
    element: ElementId,
    config: ObserverConfig,
    callback: VisibilityCallback,
    visible: bool,
    /// Cleared on disposal; checked again right before each dispatch.
    alive: Arc<AtomicBool>,
}

#[derive(Default)]
struct Registry {
    viewport: Rect,
    bounds: HashMap<ElementId, Rect>,
    observers: BTreeMap<SubscriptionId, Observer>,
    next_id: u64,
}

/// Which observers a geometry change can affect.
#[derive(Debug, Clone, Copy)]
enum Scope {
    All,
    Element(ElementId),
    Subscription(SubscriptionId),
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone)]
enum Backend {
    Supported(Arc<Mutex<Registry>>),
    /// No visibility primitive: everything is treated as visible.
    Unsupported,
}

/// Viewport intersection tracker shared by every observer in one view.
///
/// Cheap to clone; clones share the same viewport and registrations.
#[derive(Clone)]
pub struct VisibilityTracker {
    backend: Backend,
}

impl fmt::Debug for VisibilityTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.backend {
            Backend::Supported(registry) => {
                let registry = lock(registry);
                f.debug_struct("VisibilityTracker")
                    .field("viewport", &registry.viewport)
                    .field("elements", &registry.bounds.len())
                    .field("observers", &registry.observers.len())
                    .finish()
            }
            Backend::Unsupported => f
                .debug_struct("VisibilityTracker")
                .field("supported", &false)
                .finish(),
        }
    }
}

impl VisibilityTracker {
    /// Create a tracker for the given initial viewport.
    pub fn new(viewport: Rect) -> Self {
        Self {
            backend: Backend::Supported(Arc::new(Mutex::new(Registry {
                viewport,
                ..Default::default()
            }))),
        }
    }

    /// Create a tracker for a host without a visibility primitive.
    ///
    /// Every observer is told `true` synchronously from `observe` and never
    /// hears anything again, so lazy loading turns into eager loading.
    pub fn unsupported() -> Self {
        Self {
            backend: Backend::Unsupported,
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self.backend, Backend::Supported(_))
    }

    /// Current viewport (an empty rectangle for unsupported trackers).
    pub fn viewport(&self) -> Rect {
        match &self.backend {
            Backend::Supported(registry) => lock(registry).viewport,
            Backend::Unsupported => Rect::default(),
        }
    }

    /// Number of live observers.
    pub fn observer_count(&self) -> usize {
        match &self.backend {
            Backend::Supported(registry) => lock(registry).observers.len(),
            Backend::Unsupported => 0,
        }
    }

    /// Start observing `element`.
    ///
    /// The element starts out not visible; if its current bounds are already
    /// visible, `on_change(true)` runs before this returns.
    pub fn observe<F>(&self, element: ElementId, config: ObserverConfig, on_change: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let registry = match &self.backend {
            Backend::Supported(registry) => registry,
            Backend::Unsupported => {
                debug!(
                    element = element.0,
                    "Visibility detection unavailable, treating element as visible"
                );
                on_change(true);
                return Subscription::inert();
            }
        };

        let alive = Arc::new(AtomicBool::new(true));
        let id = {
            let mut registry = lock(registry);
            let id = SubscriptionId(registry.next_id);
            registry.next_id += 1;
            registry.observers.insert(
                id,
                Observer {
                    element,
                    config,
                    callback: Arc::new(on_change),
                    visible: false,
                    alive: Arc::clone(&alive),
                },
            );
            id
        };
        trace!(element = element.0, subscription = id.0, "Observer registered");

        evaluate(registry, Scope::Subscription(id));

        Subscription {
            registry: Arc::downgrade(registry),
            id: Some(id),
            alive,
        }
    }

    /// Replace the viewport rectangle and re-evaluate every observer.
    pub fn set_viewport(&self, viewport: Rect) {
        if let Backend::Supported(registry) = &self.backend {
            lock(registry).viewport = viewport;
            evaluate(registry, Scope::All);
        }
    }

    /// Move the viewport vertically to `offset`, keeping its size.
    pub fn scroll_to(&self, offset: f32) {
        if let Backend::Supported(registry) = &self.backend {
            {
                let mut registry = lock(registry);
                registry.viewport = registry.viewport.with_y(offset);
            }
            evaluate(registry, Scope::All);
        }
    }

    /// Report the bounds of an element after layout.
    pub fn set_element_bounds(&self, element: ElementId, bounds: Rect) {
        if let Backend::Supported(registry) = &self.backend {
            lock(registry).bounds.insert(element, bounds);
            evaluate(registry, Scope::Element(element));
        }
    }

    /// Forget an element and dispose every observer attached to it.
    ///
    /// Returns how many observers were disposed. No callbacks fire.
    pub fn remove_element(&self, element: ElementId) -> usize {
        let Backend::Supported(registry) = &self.backend else {
            return 0;
        };
        let mut registry = lock(registry);
        registry.bounds.remove(&element);
        let before = registry.observers.len();
        registry.observers.retain(|_, observer| {
            let keep = observer.element != element;
            if !keep {
                observer.alive.store(false, Ordering::Release);
            }
            keep
        });
        before - registry.observers.len()
    }
}

/// A transition waiting to be dispatched.
struct Fired {
    callback: VisibilityCallback,
    visible: bool,
    alive: Arc<AtomicBool>,
}

/// Recompute visibility for the observers in `scope` and dispatch
/// transitions. Callbacks run after the registry lock is released so they
/// are free to observe or dispose, including observers fired in the same
/// pass, which are then skipped.
fn evaluate(registry: &Mutex<Registry>, scope: Scope) {
    let fired: Vec<Fired> = {
        let mut guard = lock(registry);
        let registry = &mut *guard;
        let viewport = registry.viewport;
        let mut fired = Vec::new();
        let mut finished = Vec::new();

        for (id, observer) in registry.observers.iter_mut() {
            let in_scope = match scope {
                Scope::All => true,
                Scope::Element(element) => observer.element == element,
                Scope::Subscription(sub) => *id == sub,
            };
            if !in_scope {
                continue;
            }

            let visible = registry
                .bounds
                .get(&observer.element)
                .map(|bounds| observer.config.is_visible(bounds, &viewport))
                .unwrap_or(false);

            if visible == observer.visible {
                continue;
            }

            observer.visible = visible;
            fired.push(Fired {
                callback: Arc::clone(&observer.callback),
                visible,
                alive: Arc::clone(&observer.alive),
            });
            if visible && observer.config.one_shot {
                finished.push(*id);
            }
        }

        for id in finished {
            registry.observers.remove(&id);
            trace!(subscription = id.0, "One-shot observer disposed");
        }

        fired
    };

    for Fired {
        callback,
        visible,
        alive,
    } in fired
    {
        if alive.load(Ordering::Acquire) {
            (callback)(visible);
        }
    }
}

/// Scoped observer registration returned by [`VisibilityTracker::observe`].
///
/// Disposal is idempotent and also happens on drop.
#[must_use = "dropping a Subscription stops observing immediately"]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    id: Option<SubscriptionId>,
    alive: Arc<AtomicBool>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Subscription {
    /// A subscription that is not attached to anything.
    pub fn inert() -> Self {
        Self {
            registry: Weak::new(),
            id: None,
            alive: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether the observer is still registered.
    ///
    /// Turns false after `dispose`, after a one-shot observer fired, after
    /// its element was removed, or once the tracker itself is gone.
    pub fn is_active(&self) -> bool {
        match (self.id, self.registry.upgrade()) {
            (Some(id), Some(registry)) => lock(&registry).observers.contains_key(&id),
            _ => false,
        }
    }

    /// Stop observing. Safe to call any number of times.
    pub fn dispose(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        self.alive.store(false, Ordering::Release);
        if let Some(registry) = self.registry.upgrade() {
            if lock(&registry).observers.remove(&id).is_some() {
                trace!(subscription = id.0, "Observer disposed");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}
