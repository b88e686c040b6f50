//! Testing utilities and mock implementations.
//!
//! Mocks for the two host-facing seams (page sources and media elements),
//! plus fixtures for building rooms.
//!
//! # Example
//!
//! ```rust,ignore
//! use roomview_core::testing::{fixtures, MockPageSource};
//!
//! let source = Arc::new(MockPageSource::with_items(fixtures::rooms(25)));
//! source.pause();
//!
//! // ... dispatch a load, assert it stays outstanding ...
//!
//! source.resume();
//! assert_eq!(source.fetch_count().await, 1);
//! ```

mod mock_media_element;
mod mock_page_source;

pub use mock_media_element::{MediaCall, MockMediaElement};
pub use mock_page_source::{MockPageSource, RecordedFetch};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::catalog::{BedType, Room, RoomVariant};

    /// Create an image-only variant with reasonable defaults.
    pub fn variant(room_id: u32, number: u32) -> RoomVariant {
        RoomVariant {
            id: format!("{room_id}-{number}"),
            name: format!("Standard Room - Variant {number}"),
            price: 1200,
            original_price: 1800,
            discount: 33,
            bed_type: BedType::Queen,
            capacity: 2,
            description: "Comfortable accommodation with premium facilities".to_string(),
            video_url: None,
            room_images: vec![format!(
                "https://picsum.photos/400/300?random={}",
                room_id * 10 + number * 5
            )],
        }
    }

    /// Create a collapsed room with `count` variants.
    pub fn room_with_variants(id: u32, count: u32) -> Room {
        Room {
            id,
            name: format!("Room {id}"),
            variants: (1..=count).map(|v| variant(id, v)).collect(),
            expanded: false,
        }
    }

    /// Create a collapsed room with three variants.
    pub fn room(id: u32) -> Room {
        room_with_variants(id, 3)
    }

    /// Create rooms `1..=count`.
    pub fn rooms(count: u32) -> Vec<Room> {
        (1..=count).map(room).collect()
    }
}
