//! Mock page source for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, RwLock};

use crate::pagination::{FetchError, Page, PageSource, PageToken};

/// A recorded fetch for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedFetch {
    /// The page that was requested.
    pub page: PageToken,
    /// The requested page size.
    pub page_size: usize,
    /// When the fetch started.
    pub timestamp: Instant,
}

/// Mock implementation of the PageSource trait.
///
/// Provides controllable behavior for testing:
/// - Serve pages out of a configurable item list
/// - Track fetches for assertions
/// - Inject a one-off failure
/// - Hold fetches open until released
///
/// # Example
///
/// ```rust,ignore
/// use roomview_core::testing::{MockPageSource, fixtures};
///
/// let source = MockPageSource::with_items(fixtures::rooms(25));
/// source.set_next_error(FetchError::Timeout).await;
///
/// assert!(source.fetch_page(PageToken::FIRST, 10).await.is_err());
/// assert_eq!(source.fetch_page(PageToken::FIRST, 10).await?.len(), 10);
/// assert_eq!(source.fetch_count().await, 2);
/// ```
pub struct MockPageSource<T> {
    /// Items served page by page.
    items: Arc<RwLock<Vec<T>>>,
    /// Recorded fetches.
    fetches: Arc<RwLock<Vec<RecordedFetch>>>,
    /// If set, the next fetch will fail with this error.
    next_error: Arc<RwLock<Option<FetchError>>>,
    /// Fetches complete only while the gate is open.
    gate: watch::Sender<bool>,
}

impl<T> std::fmt::Debug for MockPageSource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPageSource")
            .field("items", &"<items>")
            .field("fetches", &"<fetches>")
            .field("next_error", &"<next_error>")
            .field("open", &*self.gate.borrow())
            .finish()
    }
}

impl<T> Default for MockPageSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MockPageSource<T> {
    /// Create a new mock source with no items.
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    /// Create a mock source serving `items`.
    pub fn with_items(items: Vec<T>) -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            items: Arc::new(RwLock::new(items)),
            fetches: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            gate,
        }
    }

    /// Replace the items served by subsequent fetches.
    pub async fn set_items(&self, items: Vec<T>) {
        *self.items.write().await = items;
    }

    /// Get recorded fetches.
    pub async fn recorded_fetches(&self) -> Vec<RecordedFetch> {
        self.fetches.read().await.clone()
    }

    /// Number of fetches started so far.
    pub async fn fetch_count(&self) -> usize {
        self.fetches.read().await.len()
    }

    /// Clear recorded fetches.
    pub async fn clear_recorded(&self) {
        self.fetches.write().await.clear();
    }

    /// Make the next fetch fail with this error.
    pub async fn set_next_error(&self, error: FetchError) {
        *self.next_error.write().await = Some(error);
    }

    /// Clear any pending error.
    pub async fn clear_next_error(&self) {
        *self.next_error.write().await = None;
    }

    /// Hold every fetch open until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.gate.send_replace(false);
    }

    /// Let held and future fetches complete.
    pub fn resume(&self) {
        self.gate.send_replace(true);
    }

    pub fn is_paused(&self) -> bool {
        !*self.gate.borrow()
    }

    async fn take_error(&self) -> Option<FetchError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl<T> PageSource<T> for MockPageSource<T>
where
    T: Clone + Send + Sync,
{
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_page(&self, page: PageToken, page_size: usize) -> Result<Page<T>, FetchError> {
        self.fetches.write().await.push(RecordedFetch {
            page,
            page_size,
            timestamp: Instant::now(),
        });

        let mut gate = self.gate.subscribe();
        // The sender lives in self, so this cannot observe a closed channel
        let _ = gate.wait_for(|open| *open).await;

        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        let items = self.items.read().await;
        Ok(Page::new(crate::pagination::slice_page(&items, page, page_size)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    #[tokio::test]
    async fn test_serves_pages_and_records() {
        let source = MockPageSource::with_items((1..=25).collect::<Vec<u32>>());

        let page = source.fetch_page(PageToken::new(2), 10).await.unwrap();
        assert_eq!(page.items, (21..=25).collect::<Vec<_>>());

        let fetches = source.recorded_fetches().await;
        assert_eq!(fetches.len(), 1);
        assert_eq!(fetches[0].page, PageToken::new(2));
        assert_eq!(fetches[0].page_size, 10);
    }

    #[tokio::test]
    async fn test_error_injection() {
        let source = MockPageSource::with_items(vec![1u32, 2, 3]);
        source.set_next_error(FetchError::Timeout).await;

        assert_eq!(
            source.fetch_page(PageToken::FIRST, 2).await,
            Err(FetchError::Timeout)
        );
        assert!(source.fetch_page(PageToken::FIRST, 2).await.is_ok());
    }

    #[test]
    fn test_pause_holds_fetch() {
        let source = MockPageSource::with_items(vec![1u32, 2, 3]);
        source.pause();

        let mut fetch = task::spawn(source.fetch_page(PageToken::FIRST, 2));
        assert_pending!(fetch.poll());
        assert_pending!(fetch.poll());

        source.resume();
        assert!(fetch.is_woken());
        let page = assert_ready!(fetch.poll()).unwrap();
        assert_eq!(page.items, vec![1, 2]);
    }
}
