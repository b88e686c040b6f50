//! Pagination controller.
//!
//! Owns the displayed records and drives page fetches through the
//! `Idle -> Fetching -> Idle | Exhausted` state machine. The in-flight guard
//! is taken synchronously before the first await, so no interleaving of
//! callers (direct calls, sentinel callbacks) can dispatch a second fetch
//! while one is outstanding.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::slice_page;
use super::{
    FetchError, FetchFailure, FetchPhase, LoadOutcome, Page, PageSource, PageToken,
    PaginationConfig, PaginationError, PaginationSnapshot, SkipReason, VecPageSource,
};
use crate::catalog::CatalogItem;
use crate::visibility::{ElementId, Subscription, VisibilityTracker};

struct PaginationState<T: CatalogItem> {
    displayed: Vec<Arc<T>>,
    ids: HashSet<T::Id>,
    next_page: PageToken,
    phase: FetchPhase,
    last_error: Option<FetchFailure>,
    dispatched: u64,
    mounted: bool,
}

impl<T: CatalogItem> PaginationState<T> {
    fn new() -> Self {
        Self {
            displayed: Vec::new(),
            ids: HashSet::new(),
            next_page: PageToken::FIRST,
            phase: FetchPhase::Idle,
            last_error: None,
            dispatched: 0,
            mounted: true,
        }
    }

    /// Append a whole page, or nothing if any id is already present.
    fn append(&mut self, page: PageToken, items: Vec<T>) -> Result<usize, FetchError> {
        let mut incoming = HashSet::with_capacity(items.len());
        let duplicates = items
            .iter()
            .filter(|item| {
                let id = item.id();
                self.ids.contains(&id) || !incoming.insert(id)
            })
            .count();
        if duplicates > 0 {
            return Err(FetchError::DuplicateItems {
                page: page.index(),
                count: duplicates,
            });
        }

        let count = items.len();
        self.ids.extend(incoming);
        self.displayed.extend(items.into_iter().map(Arc::new));
        self.next_page = page.next();
        Ok(count)
    }
}

/// Sentinel observer plus what is needed to re-observe it.
struct Sentinel {
    tracker: VisibilityTracker,
    element: ElementId,
    runtime: Handle,
    subscription: Subscription,
}

struct Shared<T: CatalogItem> {
    state: Mutex<PaginationState<T>>,
    source: Arc<dyn PageSource<T>>,
    config: PaginationConfig,
    sentinel: Mutex<Option<Sentinel>>,
    revision: watch::Sender<u64>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ticket for a dispatched fetch.
#[derive(Debug, Clone, Copy)]
struct FetchTicket {
    page: PageToken,
}

/// A dispatched fetch that has not settled yet.
///
/// Dropping it unsettled (a cancelled `load_next_page`, an aborted task)
/// releases the in-flight guard and leaves the cursor where it was.
struct PendingFetch<T: CatalogItem> {
    shared: Weak<Shared<T>>,
    ticket: Option<FetchTicket>,
}

impl<T: CatalogItem> PendingFetch<T> {
    fn new(shared: &Arc<Shared<T>>, ticket: FetchTicket) -> Self {
        Self {
            shared: Arc::downgrade(shared),
            ticket: Some(ticket),
        }
    }

    fn page(&self) -> PageToken {
        self.ticket.map(|ticket| ticket.page).unwrap_or_default()
    }

    fn settle(mut self, result: Result<Page<T>, FetchError>) -> LoadOutcome {
        let Some(ticket) = self.ticket.take() else {
            return LoadOutcome::Discarded;
        };
        match self.shared.upgrade() {
            Some(shared) => shared.settle(ticket, result),
            None => {
                debug!(
                    page = ticket.page.index(),
                    "Controller dropped before page settled, discarding"
                );
                LoadOutcome::Discarded
            }
        }
    }
}

impl<T: CatalogItem> Drop for PendingFetch<T> {
    fn drop(&mut self) {
        if let (Some(ticket), Some(shared)) = (self.ticket.take(), self.shared.upgrade()) {
            shared.abandon(ticket);
        }
    }
}

impl<T: CatalogItem> Shared<T> {
    fn notify(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Take the in-flight guard, or say why not.
    fn begin_fetch(&self) -> Result<FetchTicket, SkipReason> {
        let ticket = {
            let mut state = lock(&self.state);
            if !state.mounted {
                return Err(SkipReason::Unmounted);
            }
            match state.phase {
                FetchPhase::Fetching => return Err(SkipReason::InFlight),
                FetchPhase::Exhausted => return Err(SkipReason::Exhausted),
                FetchPhase::Idle => {}
            }
            state.phase = FetchPhase::Fetching;
            state.last_error = None;
            state.dispatched += 1;
            FetchTicket {
                page: state.next_page,
            }
        };

        debug!(
            source = self.source.name(),
            page = ticket.page.index(),
            page_size = self.config.page_size,
            "Dispatching page fetch"
        );
        self.notify();
        Ok(ticket)
    }

    /// Release the in-flight guard of a fetch that will never settle.
    fn abandon(&self, ticket: FetchTicket) {
        {
            let mut state = lock(&self.state);
            if state.phase != FetchPhase::Fetching {
                return;
            }
            state.phase = FetchPhase::Idle;
        }

        debug!(page = ticket.page.index(), "Page fetch abandoned before it settled");
        self.notify();
    }

    /// Apply a fetch result and release the in-flight guard.
    fn settle(&self, ticket: FetchTicket, result: Result<Page<T>, FetchError>) -> LoadOutcome {
        let outcome = {
            let mut state = lock(&self.state);
            if !state.mounted {
                debug!(page = ticket.page.index(), "Page settled after teardown, discarding");
                return LoadOutcome::Discarded;
            }

            let result = result.and_then(|page| {
                if page.is_empty() {
                    Ok(None)
                } else {
                    state.append(ticket.page, page.items).map(Some)
                }
            });

            match result {
                Ok(Some(count)) => {
                    state.phase = FetchPhase::Idle;
                    debug!(
                        page = ticket.page.index(),
                        count,
                        displayed = state.displayed.len(),
                        "Page appended"
                    );
                    LoadOutcome::Appended {
                        page: ticket.page,
                        count,
                    }
                }
                Ok(None) => {
                    state.phase = FetchPhase::Exhausted;
                    info!(
                        displayed = state.displayed.len(),
                        "Catalog exhausted, no more pages"
                    );
                    LoadOutcome::Exhausted
                }
                Err(error) => {
                    state.phase = FetchPhase::Idle;
                    warn!(page = ticket.page.index(), error = %error, "Page fetch failed");
                    state.last_error = Some(FetchFailure::new(ticket.page, error.clone()));
                    LoadOutcome::Failed { error }
                }
            }
        };

        self.notify();
        outcome
    }
}

/// Incremental pagination over a [`PageSource`].
///
/// Cheap to clone; clones drive the same state. Page appends are strictly
/// ordered by page token and at most one fetch is ever in flight.
pub struct PaginationController<T: CatalogItem> {
    shared: Arc<Shared<T>>,
}

impl<T: CatalogItem> Clone for PaginationController<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: CatalogItem> fmt::Debug for PaginationController<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.shared.state);
        f.debug_struct("PaginationController")
            .field("source", &self.shared.source.name())
            .field("displayed", &state.displayed.len())
            .field("next_page", &state.next_page)
            .field("phase", &state.phase)
            .field("last_error", &state.last_error)
            .finish()
    }
}

impl<T: CatalogItem> PaginationController<T> {
    fn with_state(
        source: Arc<dyn PageSource<T>>,
        config: PaginationConfig,
        state: PaginationState<T>,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                source,
                config,
                sentinel: Mutex::new(None),
                revision,
            }),
        }
    }

    /// Paginate a fully available in-memory sequence.
    ///
    /// The first page is displayed immediately and the cursor points at
    /// page 1. If the first page repeats an id nothing is displayed and the
    /// cursor stays on page 0.
    pub fn from_items(items: Vec<T>, config: PaginationConfig) -> Self {
        let mut state = PaginationState::new();
        let first = slice_page(&items, PageToken::FIRST, config.page_size);
        // A successful append moves the cursor to page 1, even for an empty
        // sequence; a rejected page leaves it on page 0.
        match state.append(PageToken::FIRST, first) {
            Ok(count) => debug!(count, total = items.len(), "In-memory catalog initialized"),
            Err(error) => {
                warn!(error = %error, "In-memory catalog has duplicate ids in its first page");
                state.last_error = Some(FetchFailure::new(PageToken::FIRST, error));
            }
        }

        Self::with_state(Arc::new(VecPageSource::new(items)), config, state)
    }

    /// Create a controller over a fetching source and load its first page.
    ///
    /// An empty first page exhausts the controller; a failed one leaves
    /// nothing displayed, `last_error` set and the cursor on page 0 so the
    /// next `load_next_page` retries it.
    pub async fn initialize(source: Arc<dyn PageSource<T>>, config: PaginationConfig) -> Self {
        let controller = Self::with_state(source, config, PaginationState::new());
        let outcome = controller.load_next_page().await;
        debug!(?outcome, "Pagination initialized");
        controller
    }

    /// Create a controller that has not loaded anything yet.
    pub fn unloaded(source: Arc<dyn PageSource<T>>, config: PaginationConfig) -> Self {
        Self::with_state(source, config, PaginationState::new())
    }

    pub fn config(&self) -> &PaginationConfig {
        &self.shared.config
    }

    /// Fetch and append the next page.
    ///
    /// Returns without side effects while a fetch is in flight, after
    /// exhaustion, or after teardown.
    pub async fn load_next_page(&self) -> LoadOutcome {
        let pending = match self.shared.begin_fetch() {
            Ok(ticket) => PendingFetch::new(&self.shared, ticket),
            Err(reason) => {
                debug!(?reason, "Load skipped");
                return LoadOutcome::Skipped { reason };
            }
        };

        let result = self
            .shared
            .source
            .fetch_page(pending.page(), self.shared.config.page_size)
            .await;
        pending.settle(result)
    }

    /// Flip the `expanded` flag of a displayed item.
    ///
    /// Only that item is copied; every other item keeps its `Arc`. Returns
    /// `false` if no displayed item has this id.
    pub fn toggle_item_expansion(&self, id: &T::Id) -> bool {
        let toggled = {
            let mut state = lock(&self.shared.state);
            match state.displayed.iter_mut().find(|item| item.id() == *id) {
                Some(item) => {
                    let item = Arc::make_mut(item);
                    let expanded = !item.is_expanded();
                    item.set_expanded(expanded);
                    true
                }
                None => false,
            }
        };

        if toggled {
            self.shared.notify();
        } else {
            debug!(?id, "Toggle for an item that is not displayed, ignoring");
        }
        toggled
    }

    /// Observe `element` as the end-of-list sentinel.
    ///
    /// Each time it becomes visible a fetch is dispatched (subject to the
    /// usual guards) and settled on the current tokio runtime. Replaces any
    /// previous sentinel.
    pub fn attach_sentinel(
        &self,
        tracker: &VisibilityTracker,
        element: ElementId,
    ) -> Result<(), PaginationError> {
        let runtime = Handle::try_current().map_err(|_| PaginationError::NoRuntime)?;
        let subscription = self.observe_sentinel(tracker, element, runtime.clone());

        let previous = lock(&self.shared.sentinel).replace(Sentinel {
            tracker: tracker.clone(),
            element,
            runtime,
            subscription,
        });
        drop(previous);
        Ok(())
    }

    /// Register the sentinel observer again.
    ///
    /// A fresh observer reports a sentinel that is already on screen, which
    /// is how a list that grew but still does not fill the viewport keeps
    /// loading. Call after the host has laid out newly appended items.
    pub fn rearm_sentinel(&self) {
        let target = lock(&self.shared.sentinel)
            .as_ref()
            .map(|sentinel| {
                (
                    sentinel.tracker.clone(),
                    sentinel.element,
                    sentinel.runtime.clone(),
                )
            });
        let Some((tracker, element, runtime)) = target else {
            return;
        };

        // Observe outside the sentinel lock: the callback may fire right away.
        let subscription = self.observe_sentinel(&tracker, element, runtime);
        let previous = lock(&self.shared.sentinel)
            .as_mut()
            .map(|sentinel| std::mem::replace(&mut sentinel.subscription, subscription));
        drop(previous);
    }

    fn observe_sentinel(
        &self,
        tracker: &VisibilityTracker,
        element: ElementId,
        runtime: Handle,
    ) -> Subscription {
        let weak = Arc::downgrade(&self.shared);
        let config = self.shared.config.sentinel.observer();

        tracker.observe(element, config, move |visible| {
            if !visible {
                return;
            }
            if let Some(shared) = weak.upgrade() {
                spawn_sentinel_load(&shared, &runtime);
            }
        })
    }

    /// Stop reacting: dispose the sentinel and drop any late results.
    pub fn teardown(&self) {
        let sentinel = lock(&self.shared.sentinel).take();
        drop(sentinel);

        let was_mounted = std::mem::replace(&mut lock(&self.shared.state).mounted, false);
        if was_mounted {
            debug!("Pagination controller torn down");
            self.shared.notify();
        }
    }

    pub fn is_mounted(&self) -> bool {
        lock(&self.shared.state).mounted
    }

    pub fn has_sentinel(&self) -> bool {
        lock(&self.shared.sentinel)
            .as_ref()
            .is_some_and(|sentinel| sentinel.subscription.is_active())
    }

    /// Receiver that changes on every state mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.shared.revision.borrow()
    }

    pub fn snapshot(&self) -> PaginationSnapshot<T> {
        let state = lock(&self.shared.state);
        PaginationSnapshot {
            displayed: state.displayed.clone(),
            next_page: state.next_page,
            phase: state.phase,
            last_error: state.last_error.clone(),
            dispatched: state.dispatched,
        }
    }

    pub fn displayed(&self) -> Vec<Arc<T>> {
        lock(&self.shared.state).displayed.clone()
    }

    pub fn displayed_len(&self) -> usize {
        lock(&self.shared.state).displayed.len()
    }

    pub fn next_page(&self) -> PageToken {
        lock(&self.shared.state).next_page
    }

    pub fn phase(&self) -> FetchPhase {
        lock(&self.shared.state).phase
    }

    pub fn is_fetching(&self) -> bool {
        self.phase() == FetchPhase::Fetching
    }

    pub fn is_exhausted(&self) -> bool {
        self.phase() == FetchPhase::Exhausted
    }

    pub fn last_error(&self) -> Option<FetchFailure> {
        lock(&self.shared.state).last_error.clone()
    }

    /// Number of fetches dispatched since creation.
    pub fn dispatched(&self) -> u64 {
        lock(&self.shared.state).dispatched
    }

    /// Handle that toggles expansion without keeping the controller alive.
    pub fn toggle_handle(&self) -> ToggleExpand<T> {
        ToggleExpand {
            shared: Arc::downgrade(&self.shared),
        }
    }
}

/// Dispatch from a sentinel callback: guard synchronously, settle later.
fn spawn_sentinel_load<T: CatalogItem>(shared: &Arc<Shared<T>>, runtime: &Handle) {
    let pending = match shared.begin_fetch() {
        Ok(ticket) => PendingFetch::new(shared, ticket),
        Err(reason) => {
            debug!(?reason, "Sentinel visible, load skipped");
            return;
        }
    };

    let source = Arc::clone(&shared.source);
    let page_size = shared.config.page_size;

    runtime.spawn(async move {
        let result = source.fetch_page(pending.page(), page_size).await;
        pending.settle(result);
    });
}

/// Expansion callback handed to item presenters.
pub struct ToggleExpand<T: CatalogItem> {
    shared: Weak<Shared<T>>,
}

impl<T: CatalogItem> Clone for ToggleExpand<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<T: CatalogItem> fmt::Debug for ToggleExpand<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToggleExpand")
            .field("attached", &(self.shared.strong_count() > 0))
            .finish()
    }
}

impl<T: CatalogItem> ToggleExpand<T> {
    /// Toggle `id`; a no-op once the controller is gone.
    pub fn toggle(&self, id: &T::Id) -> bool {
        match self.shared.upgrade() {
            Some(shared) => PaginationController { shared }.toggle_item_expansion(id),
            None => false,
        }
    }
}
