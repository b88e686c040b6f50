//! Mock room catalog.
//!
//! Generates plausible rooms and serves them page by page with simulated
//! latency, standing in for a real listings backend.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::debug;

use crate::catalog::{BedType, Room, RoomVariant};
use crate::config::MockConfig;
use crate::pagination::{FetchError, Page, PageSource, PageToken};

const ROOM_TYPES: [&str; 6] = [
    "Deluxe Suite",
    "Standard Room",
    "Executive Suite",
    "Presidential Suite",
    "Ocean View",
    "Garden View",
];

const DESCRIPTIONS: [&str; 5] = [
    "Spacious room with modern amenities and city view",
    "Comfortable accommodation with premium facilities",
    "Luxury suite with panoramic views and exclusive services",
    "Elegant room featuring contemporary design and comfort",
    "Premium accommodation with world-class amenities",
];

fn pick<'a, T>(rng: &mut StdRng, items: &'a [T]) -> &'a T {
    &items[rng.random_range(0..items.len())]
}

/// Generate rooms `1..=count`. The same seed always yields the same rooms.
pub fn generate_rooms(count: usize, seed: u64) -> Vec<Room> {
    let mut rng = StdRng::seed_from_u64(seed);
    (1..=count as u32)
        .map(|room_id| generate_room(&mut rng, room_id))
        .collect()
}

fn generate_room(rng: &mut StdRng, room_id: u32) -> Room {
    let has_video = rng.random_bool(0.4);
    let image_count = rng.random_range(1..=5u32);
    let variant_count = rng.random_range(2..=7u32);

    let variants = (1..=variant_count)
        .map(|v| {
            let video_url = has_video.then(|| {
                format!(
                    "https://sample-videos.com/zip/10/mp4/SampleVideo_{}.mp4",
                    rng.random_range(1..=5)
                )
            });
            // Video rooms sometimes come without stills
            let room_images = if !has_video || rng.random_bool(0.7) {
                (0..image_count)
                    .map(|idx| {
                        format!(
                            "https://picsum.photos/400/300?random={}",
                            room_id * 10 + v * 5 + idx
                        )
                    })
                    .collect()
            } else {
                Vec::new()
            };

            RoomVariant {
                id: format!("{room_id}-{v}"),
                name: format!("{} - Variant {v}", pick(rng, &ROOM_TYPES)),
                price: rng.random_range(500..3500),
                original_price: rng.random_range(1000..5000),
                discount: rng.random_range(10..50),
                bed_type: *pick(rng, &BedType::ALL),
                capacity: rng.random_range(1..=4),
                description: pick(rng, &DESCRIPTIONS).to_string(),
                video_url,
                room_images,
            }
        })
        .collect();

    Room {
        id: room_id,
        name: format!("Room {room_id}"),
        variants,
        expanded: false,
    }
}

/// Page source over a generated catalog.
pub struct MockRoomSource {
    rooms: Vec<Room>,
    latency: Duration,
    failure_rate: f64,
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for MockRoomSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRoomSource")
            .field("rooms", &self.rooms.len())
            .field("latency", &self.latency)
            .field("failure_rate", &self.failure_rate)
            .finish()
    }
}

impl MockRoomSource {
    pub fn new(rooms: Vec<Room>, seed: u64) -> Self {
        Self {
            rooms,
            latency: Duration::ZERO,
            failure_rate: 0.0,
            // Failures draw from their own stream so they do not shift the catalog
            rng: Mutex::new(StdRng::seed_from_u64(seed.wrapping_add(1))),
        }
    }

    pub fn from_config(config: &MockConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        debug!(
            seed,
            rooms = config.room_count,
            latency_ms = config.latency_ms,
            "Generating mock catalog"
        );
        Self::new(generate_rooms(config.room_count, seed), seed)
            .with_latency(Duration::from_millis(config.latency_ms))
            .with_failure_rate(config.failure_rate)
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = failure_rate.clamp(0.0, 1.0);
        self
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    fn roll_failure(&self) -> bool {
        if self.failure_rate <= 0.0 {
            return false;
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.random_bool(self.failure_rate)
    }
}

#[async_trait]
impl PageSource<Room> for MockRoomSource {
    fn name(&self) -> &str {
        "mock-rooms"
    }

    async fn fetch_page(&self, page: PageToken, page_size: usize) -> Result<Page<Room>, FetchError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.roll_failure() {
            return Err(FetchError::Source(format!(
                "simulated failure fetching page {}",
                page.index()
            )));
        }

        Ok(Page::new(crate::pagination::slice_page(
            &self.rooms,
            page,
            page_size,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_rooms_shape() {
        let rooms = generate_rooms(50, 7);
        assert_eq!(rooms.len(), 50);

        for (idx, room) in rooms.iter().enumerate() {
            assert_eq!(room.id, idx as u32 + 1);
            assert_eq!(room.name, format!("Room {}", room.id));
            assert!(!room.expanded);
            assert!((2..=7).contains(&room.variants.len()));

            for (v, variant) in room.variants.iter().enumerate() {
                assert_eq!(variant.id, format!("{}-{}", room.id, v + 1));
                assert!((500..3500).contains(&variant.price));
                assert!((1000..5000).contains(&variant.original_price));
                assert!((10..50).contains(&variant.discount));
                assert!((1..=4).contains(&variant.capacity));
                assert!(variant.room_images.len() <= 5);
                if variant.video_url.is_none() {
                    assert!(!variant.room_images.is_empty());
                }
            }

            // Video is decided per room
            let with_video = room.variants.iter().filter(|v| v.video_url.is_some()).count();
            assert!(with_video == 0 || with_video == room.variants.len());
        }
    }

    #[test]
    fn test_generate_rooms_deterministic() {
        assert_eq!(generate_rooms(20, 99), generate_rooms(20, 99));
        assert_ne!(generate_rooms(20, 1), generate_rooms(20, 2));
    }

    #[test]
    fn test_generated_ids_unique() {
        let rooms = generate_rooms(100, 3);
        let ids: HashSet<u32> = rooms.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), 100);
    }

    #[tokio::test]
    async fn test_mock_source_pages() {
        let source = MockRoomSource::new(generate_rooms(25, 1), 1);
        let page = source.fetch_page(PageToken::new(2), 10).await.unwrap();
        let ids: Vec<u32> = page.items.iter().map(|r| r.id).collect();
        assert_eq!(ids, (21..=25).collect::<Vec<_>>());
        assert!(source.fetch_page(PageToken::new(3), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mock_source_always_fails() {
        let source = MockRoomSource::new(generate_rooms(5, 1), 1).with_failure_rate(1.0);
        let result = source.fetch_page(PageToken::FIRST, 10).await;
        assert!(matches!(result, Err(FetchError::Source(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_source_latency() {
        let source =
            MockRoomSource::new(generate_rooms(5, 1), 1).with_latency(Duration::from_millis(1000));
        let started = tokio::time::Instant::now();
        source.fetch_page(PageToken::FIRST, 10).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(1000));
    }
}
