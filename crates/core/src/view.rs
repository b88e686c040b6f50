//! Catalog view.
//!
//! Turns pagination state into renderable frames. Item rendering is left to
//! an [`ItemPresenter`]; the view adds the list-level affordances (loading
//! indicator, error banner, end-of-list notice, initial skeletons) and keeps
//! the sentinel wired to the controller while mounted.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::catalog::CatalogItem;
use crate::pagination::{PaginationController, PaginationError, ToggleExpand};
use crate::visibility::{ElementId, VisibilityTracker};

/// Renders one catalog record.
///
/// Presenters must not mutate the record; expansion goes through
/// `on_toggle_expand`, which may be cloned and invoked later.
pub trait ItemPresenter<T: CatalogItem> {
    type Output;

    fn present(&self, item: &T, on_toggle_expand: &ToggleExpand<T>) -> Self::Output;
}

/// List-level view settings and wording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Placeholders shown while nothing is displayed yet.
    #[serde(default = "default_skeleton_count")]
    pub skeleton_count: usize,

    /// Variants shown per room before "Show More".
    #[serde(default = "default_collapsed_variants")]
    pub collapsed_variants: usize,

    #[serde(default = "default_loading_message")]
    pub loading_message: String,

    #[serde(default = "default_error_message")]
    pub error_message: String,

    #[serde(default = "default_exhausted_message")]
    pub exhausted_message: String,
}

fn default_skeleton_count() -> usize {
    6
}

fn default_collapsed_variants() -> usize {
    2
}

fn default_loading_message() -> String {
    "Loading more rooms...".to_string()
}

fn default_error_message() -> String {
    "Failed to load more rooms. Please try again.".to_string()
}

fn default_exhausted_message() -> String {
    "No more rooms to load".to_string()
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            skeleton_count: default_skeleton_count(),
            collapsed_variants: default_collapsed_variants(),
            loading_message: default_loading_message(),
            error_message: default_error_message(),
            exhausted_message: default_exhausted_message(),
        }
    }
}

/// One rendered state of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogFrame<O> {
    /// Controller revision this frame reflects.
    pub revision: u64,
    pub items: Vec<O>,
    /// A page fetch is in flight.
    pub loading: bool,
    pub error_banner: Option<String>,
    pub exhausted_notice: Option<String>,
    /// Number of skeleton placeholders to draw.
    pub skeletons: usize,
}

/// Composes a pagination controller with an item presenter.
///
/// Presenter output is cached per item and reused while the item's `Arc`
/// is unchanged, so toggling one room re-presents only that room.
pub struct CatalogView<T: CatalogItem, P: ItemPresenter<T>> {
    controller: PaginationController<T>,
    presenter: P,
    config: ViewConfig,
    changes: watch::Receiver<u64>,
    cache: HashMap<T::Id, (Arc<T>, P::Output)>,
    laid_out: usize,
    mounted: bool,
}

impl<T, P> fmt::Debug for CatalogView<T, P>
where
    T: CatalogItem,
    P: ItemPresenter<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogView")
            .field("controller", &self.controller)
            .field("cached", &self.cache.len())
            .field("mounted", &self.mounted)
            .finish()
    }
}

impl<T, P> CatalogView<T, P>
where
    T: CatalogItem,
    P: ItemPresenter<T>,
{
    pub fn new(controller: PaginationController<T>, presenter: P, config: ViewConfig) -> Self {
        let changes = controller.subscribe();
        Self {
            controller,
            presenter,
            config,
            changes,
            cache: HashMap::new(),
            laid_out: 0,
            mounted: false,
        }
    }

    pub fn controller(&self) -> &PaginationController<T> {
        &self.controller
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Attach the end-of-list sentinel and start reacting to it.
    pub fn mount(
        &mut self,
        tracker: &VisibilityTracker,
        sentinel: ElementId,
    ) -> Result<(), PaginationError> {
        self.controller.attach_sentinel(tracker, sentinel)?;
        self.laid_out = self.controller.displayed_len();
        self.mounted = true;
        debug!(sentinel = sentinel.0, "Catalog view mounted");
        Ok(())
    }

    /// Tell the view the host has laid out the current items.
    ///
    /// If the list grew since the last layout the sentinel is observed
    /// afresh, so a sentinel still on screen after an append triggers the
    /// next page instead of waiting for a scroll.
    pub fn commit_layout(&mut self) {
        let len = self.controller.displayed_len();
        let grew = len > self.laid_out;
        self.laid_out = len;

        if grew && self.mounted && !self.controller.is_exhausted() {
            self.controller.rearm_sentinel();
        }
    }

    /// Tear down the controller and drop cached output.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.controller.teardown();
        self.cache.clear();
        debug!("Catalog view unmounted");
    }

    /// Wait until the controller state changes.
    ///
    /// Returns `false` once the controller is gone.
    pub async fn changed(&mut self) -> bool {
        self.changes.changed().await.is_ok()
    }

    pub fn has_changed(&self) -> bool {
        self.changes.has_changed().unwrap_or(false)
    }
}

impl<T, P> CatalogView<T, P>
where
    T: CatalogItem,
    P: ItemPresenter<T>,
    P::Output: Clone,
{
    /// Render the current state.
    pub fn render(&mut self) -> CatalogFrame<P::Output> {
        let revision = *self.changes.borrow_and_update();
        let snapshot = self.controller.snapshot();
        let on_toggle_expand = self.controller.toggle_handle();

        let mut items = Vec::with_capacity(snapshot.displayed.len());
        let mut presented = 0usize;
        for item in &snapshot.displayed {
            let id = item.id();
            let cached = self
                .cache
                .get(&id)
                .filter(|(seen, _)| Arc::ptr_eq(seen, item))
                .map(|(_, output)| output.clone());

            let output = match cached {
                Some(output) => output,
                None => {
                    presented += 1;
                    let output = self.presenter.present(item, &on_toggle_expand);
                    self.cache.insert(id, (Arc::clone(item), output.clone()));
                    output
                }
            };
            items.push(output);
        }
        if presented > 0 {
            debug!(presented, total = items.len(), revision, "Rendered catalog frame");
        }

        let empty = snapshot.displayed.is_empty();
        let error_banner = snapshot
            .last_error
            .as_ref()
            .map(|_| self.config.error_message.clone());
        let exhausted_notice = (snapshot.is_exhausted() && !empty)
            .then(|| self.config.exhausted_message.clone());
        let skeletons = if empty && error_banner.is_none() {
            self.config.skeleton_count
        } else {
            0
        };

        CatalogFrame {
            revision,
            items,
            loading: snapshot.is_fetching(),
            error_banner,
            exhausted_notice,
            skeletons,
        }
    }
}

impl<T, P> Drop for CatalogView<T, P>
where
    T: CatalogItem,
    P: ItemPresenter<T>,
{
    fn drop(&mut self) {
        self.unmount();
    }
}
