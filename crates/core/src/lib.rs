//! Viewport-driven lazy loading and incremental pagination.
//!
//! The host reports viewport and element geometry to a
//! [`VisibilityTracker`]; [`LazyMedia`] and [`PaginationController`] react to
//! visibility transitions, and a [`CatalogView`] turns the resulting state
//! into frames.

pub mod catalog;
pub mod config;
pub mod geometry;
pub mod media;
pub mod mock;
pub mod pagination;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod view;
pub mod visibility;

pub use catalog::{BedType, CatalogItem, Room, RoomVariant};
pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, MockConfig,
};
pub use geometry::Rect;
pub use media::{
    HasMedia, LazyMedia, MediaConfig, MediaElement, MediaKind, MediaPresentation, MediaRef,
    MediaState, PlaybackError,
};
pub use mock::{generate_rooms, MockRoomSource};
pub use pagination::{
    FetchError, FetchPhase, LoadOutcome, Page, PageSource, PageToken, PaginationConfig,
    PaginationController, PaginationError, SentinelConfig,
};
pub use view::{CatalogFrame, CatalogView, ItemPresenter, ViewConfig};
pub use visibility::{ElementId, ObserverConfig, Subscription, VisibilityTracker};
