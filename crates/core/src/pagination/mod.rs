//! Incremental pagination.
//!
//! A [`PaginationController`] appends pages from a [`PageSource`] one at a
//! time, either on request or when an end-of-list sentinel element becomes
//! visible in a [`VisibilityTracker`](crate::visibility::VisibilityTracker).
//!
//! # Example
//!
//! ```rust,ignore
//! let controller = PaginationController::initialize(source, PaginationConfig::default()).await;
//! controller.attach_sentinel(&tracker, sentinel_element)?;
//!
//! let mut changes = controller.subscribe();
//! while changes.changed().await.is_ok() {
//!     render(&controller.snapshot());
//! }
//! ```

mod config;
mod controller;
mod source;
mod types;

pub use config::{PaginationConfig, SentinelConfig};
pub use controller::{PaginationController, ToggleExpand};
pub use source::{FnPageSource, PageSource, VecPageSource};
pub(crate) use source::slice_page;
pub use types::*;
