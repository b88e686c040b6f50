//! Types for incremental pagination.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cursor naming the page the next fetch retrieves.
///
/// Advances by exactly one per successful non-empty fetch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PageToken(u32);

impl PageToken {
    pub const FIRST: PageToken = PageToken(0);

    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Zero-based page index.
    pub fn index(&self) -> u32 {
        self.0
    }

    pub fn next(&self) -> PageToken {
        PageToken(self.0.saturating_add(1))
    }
}

/// Items produced by one fetch. Empty means the source is exhausted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn empty() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> From<Vec<T>> for Page<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

/// Errors a page fetch can settle with. All of them are retryable.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FetchError {
    #[error("page source failed: {0}")]
    Source(String),

    #[error("page fetch timed out")]
    Timeout,

    #[error("page {page} repeats {count} item(s) already displayed")]
    DuplicateItems { page: u32, count: usize },
}

/// The last failed fetch, kept until the next attempt starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub page: PageToken,
    pub error: FetchError,
    pub occurred_at: DateTime<Utc>,
}

impl FetchFailure {
    pub fn new(page: PageToken, error: FetchError) -> Self {
        Self {
            page,
            error,
            occurred_at: Utc::now(),
        }
    }
}

/// Fetch lifecycle of a pagination controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchPhase {
    #[default]
    Idle,
    /// A fetch is in flight.
    Fetching,
    /// A fetch returned an empty page. Terminal.
    Exhausted,
}

/// Why `load_next_page` returned without dispatching a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    InFlight,
    Exhausted,
    Unmounted,
}

/// Result of one `load_next_page` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoadOutcome {
    /// Nothing was dispatched.
    Skipped { reason: SkipReason },
    /// A page was appended.
    Appended { page: PageToken, count: usize },
    /// The source returned an empty page.
    Exhausted,
    /// The fetch failed; state is unchanged apart from `last_error`.
    Failed { error: FetchError },
    /// The fetch settled after teardown and was dropped.
    Discarded,
}

impl LoadOutcome {
    pub fn is_dispatched(&self) -> bool {
        !matches!(self, LoadOutcome::Skipped { .. })
    }
}

/// Point-in-time copy of the pagination state for rendering.
///
/// Items are shared `Arc`s, so an untouched item keeps its pointer across
/// snapshots.
#[derive(Debug, Clone)]
pub struct PaginationSnapshot<T> {
    pub displayed: Vec<Arc<T>>,
    pub next_page: PageToken,
    pub phase: FetchPhase,
    pub last_error: Option<FetchFailure>,
    /// Number of fetches dispatched so far.
    pub dispatched: u64,
}

impl<T> PaginationSnapshot<T> {
    pub fn is_fetching(&self) -> bool {
        self.phase == FetchPhase::Fetching
    }

    pub fn is_exhausted(&self) -> bool {
        self.phase == FetchPhase::Exhausted
    }
}

/// Errors from wiring a controller into a host.
#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("sentinel-triggered loads need a running tokio runtime")]
    NoRuntime,
}
