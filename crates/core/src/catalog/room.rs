//! Room listing records.

use serde::{Deserialize, Serialize};

use super::CatalogItem;
use crate::media::{HasMedia, MediaRef};

/// A room with its bookable variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: u32,
    pub name: String,
    pub variants: Vec<RoomVariant>,
    /// Whether all variants are shown (UI-local).
    #[serde(default)]
    pub expanded: bool,
}

/// One bookable variant of a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomVariant {
    /// `"<room id>-<variant number>"`.
    pub id: String,
    pub name: String,
    /// Nightly price in RM.
    pub price: u32,
    pub original_price: u32,
    /// Discount percentage.
    pub discount: u8,
    pub bed_type: BedType,
    /// Maximum adults.
    pub capacity: u8,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default)]
    pub room_images: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BedType {
    Single,
    Double,
    Queen,
    King,
}

impl BedType {
    pub const ALL: [BedType; 4] = [BedType::Single, BedType::Double, BedType::Queen, BedType::King];

    pub fn label(&self) -> &'static str {
        match self {
            BedType::Single => "Single",
            BedType::Double => "Double",
            BedType::Queen => "Queen",
            BedType::King => "King",
        }
    }
}

impl Room {
    /// Variants to show given the expansion flag and the collapsed limit.
    pub fn visible_variants(&self, collapsed_limit: usize) -> &[RoomVariant] {
        if self.expanded {
            &self.variants
        } else {
            &self.variants[..self.variants.len().min(collapsed_limit)]
        }
    }

    /// Number of variants hidden while collapsed.
    pub fn hidden_variant_count(&self, collapsed_limit: usize) -> usize {
        self.variants.len().saturating_sub(collapsed_limit)
    }
}

impl CatalogItem for Room {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }

    fn is_expanded(&self) -> bool {
        self.expanded
    }

    fn set_expanded(&mut self, expanded: bool) {
        self.expanded = expanded;
    }
}

impl HasMedia for RoomVariant {
    /// A video wins over images; otherwise the first image, if any.
    fn media(&self) -> Option<MediaRef> {
        if let Some(url) = &self.video_url {
            return Some(MediaRef::video(url.clone()));
        }
        self.room_images.first().map(|url| MediaRef::image(url.clone()))
    }
}
