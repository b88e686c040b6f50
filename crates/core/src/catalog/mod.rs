//! Catalog records.
//!
//! The pagination engine only needs an id and an `expanded` flag from a
//! record; everything else belongs to the presentation layer.

mod room;

pub use room::{BedType, Room, RoomVariant};

use std::fmt::Debug;
use std::hash::Hash;

/// A record that can be paginated and displayed.
pub trait CatalogItem: Clone + Send + Sync + 'static {
    /// Unique identifier within one catalog.
    type Id: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    fn id(&self) -> Self::Id;

    /// UI-local "show all nested records" flag.
    fn is_expanded(&self) -> bool;

    fn set_expanded(&mut self, expanded: bool);
}
