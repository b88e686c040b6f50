//! Pagination lifecycle integration tests.
//!
//! These tests drive a pagination controller the way a host does:
//! - Direct `load_next_page` calls and their guards
//! - Failure and retry of the same page
//! - Cancelled loads releasing the in-flight guard
//! - Sentinel-triggered loads through a visibility tracker
//! - Teardown while a fetch is outstanding

use std::sync::Arc;
use std::time::Duration;

use tokio_test::{assert_pending, assert_ready, task};

use roomview_core::{
    catalog::Room,
    geometry::Rect,
    pagination::{
        FetchError, LoadOutcome, PageToken, PaginationConfig, PaginationController, SkipReason,
    },
    testing::{fixtures, MockPageSource},
    view::{CatalogView, ItemPresenter, ViewConfig},
    visibility::{ElementId, VisibilityTracker},
};

const ROW_HEIGHT: f32 = 100.0;
const VIEWPORT_HEIGHT: f32 = 600.0;
const SENTINEL: ElementId = ElementId(u64::MAX);

/// Test helper wiring a controller, a mock source and a list layout.
struct TestHarness {
    tracker: VisibilityTracker,
    source: Arc<MockPageSource<Room>>,
    controller: PaginationController<Room>,
}

impl TestHarness {
    async fn new(total: u32, page_size: usize) -> Self {
        let tracker = VisibilityTracker::new(Rect::new(0.0, 0.0, 400.0, VIEWPORT_HEIGHT));
        let source = Arc::new(MockPageSource::with_items(fixtures::rooms(total)));
        let controller = PaginationController::<Room>::initialize(
            source.clone(),
            PaginationConfig::default().with_page_size(page_size),
        )
        .await;

        let harness = Self {
            tracker,
            source,
            controller,
        };
        harness.layout();
        harness
    }

    /// Place the sentinel right after the last displayed row.
    fn layout(&self) {
        let rows = self.controller.displayed_len() as f32;
        self.tracker
            .set_element_bounds(SENTINEL, Rect::new(0.0, rows * ROW_HEIGHT, 400.0, 10.0));
    }

    /// Scroll so the sentinel is inside the viewport.
    fn scroll_to_end(&self) {
        let rows = self.controller.displayed_len() as f32;
        self.tracker
            .scroll_to((rows * ROW_HEIGHT - VIEWPORT_HEIGHT + 50.0).max(0.0));
    }

    /// Wait until no fetch is in flight.
    async fn settled(&self) {
        let mut changes = self.controller.subscribe();
        while self.controller.is_fetching() {
            changes.changed().await.unwrap();
        }
    }

    async fn fetched_pages(&self) -> Vec<u32> {
        self.source
            .recorded_fetches()
            .await
            .iter()
            .map(|fetch| fetch.page.index())
            .collect()
    }
}

struct IdPresenter;

impl ItemPresenter<Room> for IdPresenter {
    type Output = u32;

    fn present(&self, room: &Room, _: &roomview_core::pagination::ToggleExpand<Room>) -> u32 {
        room.id
    }
}

#[tokio::test]
async fn test_pages_through_25_items() {
    let harness = TestHarness::new(25, 10).await;
    let controller = &harness.controller;
    assert_eq!(controller.displayed_len(), 10);

    controller.load_next_page().await;
    assert_eq!(controller.displayed_len(), 20);

    controller.load_next_page().await;
    assert_eq!(controller.displayed_len(), 25);
    assert!(!controller.is_exhausted());

    assert_eq!(controller.load_next_page().await, LoadOutcome::Exhausted);
    assert!(controller.is_exhausted());
    assert_eq!(controller.displayed_len(), 25);

    let ids: Vec<u32> = controller.displayed().iter().map(|room| room.id).collect();
    assert_eq!(ids, (1..=25).collect::<Vec<_>>());
    assert_eq!(harness.fetched_pages().await, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_exhaustion_is_sticky() {
    let harness = TestHarness::new(5, 10).await;
    let controller = &harness.controller;
    controller.load_next_page().await;
    assert!(controller.is_exhausted());

    let before = controller.snapshot();
    for _ in 0..3 {
        assert_eq!(
            controller.load_next_page().await,
            LoadOutcome::Skipped {
                reason: SkipReason::Exhausted
            }
        );
    }
    let after = controller.snapshot();

    assert_eq!(after.displayed.len(), before.displayed.len());
    assert_eq!(after.next_page, before.next_page);
    assert_eq!(after.last_error, before.last_error);
    assert_eq!(harness.source.fetch_count().await, 2);
}

#[tokio::test]
async fn test_concurrent_loads_dispatch_one_fetch() {
    let harness = TestHarness::new(25, 10).await;
    let controller = &harness.controller;
    harness.source.pause();

    let mut first = task::spawn(controller.load_next_page());
    assert_pending!(first.poll());
    assert!(controller.is_fetching());

    for _ in 0..5 {
        assert_eq!(
            controller.load_next_page().await,
            LoadOutcome::Skipped {
                reason: SkipReason::InFlight
            }
        );
    }

    harness.source.resume();
    let outcome = assert_ready!(first.poll());
    assert_eq!(
        outcome,
        LoadOutcome::Appended {
            page: PageToken::new(1),
            count: 10
        }
    );
    assert!(!controller.is_fetching());
    assert_eq!(harness.fetched_pages().await, vec![0, 1]);
}

#[tokio::test]
async fn test_failed_fetch_retries_same_page() {
    let harness = TestHarness::new(25, 10).await;
    let controller = &harness.controller;
    harness
        .source
        .set_next_error(FetchError::Source("connection reset".into()))
        .await;

    let outcome = controller.load_next_page().await;
    assert!(matches!(outcome, LoadOutcome::Failed { .. }));
    assert_eq!(controller.displayed_len(), 10);
    assert_eq!(controller.next_page(), PageToken::new(1));
    let failure = controller.last_error().unwrap();
    assert_eq!(failure.page, PageToken::new(1));
    assert_eq!(failure.error, FetchError::Source("connection reset".into()));

    controller.load_next_page().await;
    assert_eq!(controller.displayed_len(), 20);
    assert!(controller.last_error().is_none());
    assert_eq!(harness.fetched_pages().await, vec![0, 1, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_load_can_be_retried() {
    let harness = TestHarness::new(25, 10).await;
    let controller = &harness.controller;
    harness.source.pause();

    let timed_out =
        tokio::time::timeout(Duration::from_millis(20), controller.load_next_page()).await;
    assert!(timed_out.is_err());
    assert!(!controller.is_fetching());
    assert_eq!(controller.next_page(), PageToken::new(1));
    assert!(controller.last_error().is_none());

    harness.source.resume();
    assert_eq!(
        controller.load_next_page().await,
        LoadOutcome::Appended {
            page: PageToken::new(1),
            count: 10
        }
    );
    assert_eq!(controller.displayed_len(), 20);
    assert_eq!(harness.fetched_pages().await, vec![0, 1, 1]);
}

#[tokio::test]
async fn test_error_clears_when_next_attempt_starts() {
    let harness = TestHarness::new(25, 10).await;
    let controller = &harness.controller;
    harness.source.set_next_error(FetchError::Timeout).await;
    controller.load_next_page().await;
    assert!(controller.last_error().is_some());

    harness.source.pause();
    let mut retry = task::spawn(controller.load_next_page());
    assert_pending!(retry.poll());
    assert!(controller.last_error().is_none());

    harness.source.resume();
    assert_ready!(retry.poll());
}

#[tokio::test]
async fn test_sentinel_visible_twice_fetches_once() {
    let harness = TestHarness::new(25, 10).await;
    let controller = &harness.controller;
    controller
        .attach_sentinel(&harness.tracker, SENTINEL)
        .unwrap();
    harness.source.pause();

    harness.scroll_to_end();
    assert!(controller.is_fetching());

    // Away and back while the fetch is outstanding
    harness.tracker.scroll_to(0.0);
    harness.scroll_to_end();
    assert_eq!(controller.dispatched(), 2);

    harness.source.resume();
    harness.settled().await;

    assert_eq!(controller.displayed_len(), 20);
    assert_eq!(harness.fetched_pages().await, vec![0, 1]);
}

#[tokio::test]
async fn test_sentinel_scroll_session_reaches_exhaustion() {
    let harness = TestHarness::new(25, 10).await;
    let controller = &harness.controller;
    controller
        .attach_sentinel(&harness.tracker, SENTINEL)
        .unwrap();

    for _ in 0..10 {
        harness.scroll_to_end();
        harness.settled().await;
        harness.layout();
        harness.tracker.scroll_to(0.0);
        if controller.is_exhausted() {
            break;
        }
    }

    assert!(controller.is_exhausted());
    assert_eq!(controller.displayed_len(), 25);
    assert_eq!(harness.fetched_pages().await, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_short_list_keeps_loading_after_layout() {
    // Two 100-unit rows per page never fill a 600-unit viewport
    let harness = TestHarness::new(25, 2).await;
    let controller = harness.controller.clone();
    let mut view = CatalogView::new(controller.clone(), IdPresenter, ViewConfig::default());

    view.mount(&harness.tracker, SENTINEL).unwrap();
    assert!(controller.is_fetching());

    loop {
        harness.settled().await;
        harness.layout();
        view.commit_layout();
        if !controller.is_fetching() {
            break;
        }
    }

    // The sentinel at y=600 only touches the viewport edge
    assert_eq!(controller.displayed_len(), 6);
    assert_eq!(harness.fetched_pages().await, vec![0, 1, 2]);
    assert_eq!(view.render().items, vec![1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn test_teardown_discards_late_page() {
    let harness = TestHarness::new(25, 10).await;
    let controller = &harness.controller;
    controller
        .attach_sentinel(&harness.tracker, SENTINEL)
        .unwrap();
    harness.source.pause();

    harness.scroll_to_end();
    assert!(controller.is_fetching());
    controller.teardown();
    assert_eq!(harness.tracker.observer_count(), 0);

    harness.source.resume();
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    assert_eq!(controller.displayed_len(), 10);
    assert_eq!(controller.next_page(), PageToken::new(1));
    assert_eq!(harness.fetched_pages().await, vec![0, 1]);
}

#[tokio::test]
async fn test_overlapping_page_is_rejected() {
    let mut items = fixtures::rooms(20);
    items[12] = fixtures::room(4);
    let source = Arc::new(MockPageSource::with_items(items));
    let controller = PaginationController::<Room>::initialize(
        source.clone(),
        PaginationConfig::default().with_page_size(10),
    )
    .await;

    let outcome = controller.load_next_page().await;
    assert_eq!(
        outcome,
        LoadOutcome::Failed {
            error: FetchError::DuplicateItems { page: 1, count: 1 }
        }
    );
    assert_eq!(controller.displayed_len(), 10);
    assert!(controller.last_error().is_some());

    // Fixed upstream: the same page is requested again
    source.set_items(fixtures::rooms(20)).await;
    controller.load_next_page().await;
    assert_eq!(controller.displayed_len(), 20);
}
