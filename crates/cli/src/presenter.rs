//! Text presentation of rooms.

use serde::Serialize;

use roomview_core::{
    catalog::{Room, RoomVariant},
    media::{HasMedia, MediaRef},
    pagination::ToggleExpand,
    view::ItemPresenter,
};

/// Rendered variant row.
#[derive(Debug, Clone, Serialize)]
pub struct VariantLine {
    pub id: String,
    /// Position within the room.
    pub index: usize,
    pub name: String,
    pub price: u32,
    pub original_price: u32,
    pub discount: u8,
    pub bed: &'static str,
    pub capacity: u8,
    pub description: String,
    pub media: Option<MediaRef>,
}

impl VariantLine {
    fn new(index: usize, variant: &RoomVariant) -> Self {
        Self {
            id: variant.id.clone(),
            index,
            name: variant.name.clone(),
            price: variant.price,
            original_price: variant.original_price,
            discount: variant.discount,
            bed: variant.bed_type.label(),
            capacity: variant.capacity,
            description: variant.description.clone(),
            media: variant.media(),
        }
    }
}

/// Rendered room card.
#[derive(Debug, Clone, Serialize)]
pub struct RoomCard {
    pub id: u32,
    pub title: String,
    pub variants: Vec<VariantLine>,
    /// "Show More (n more variants)" or "Show Less", when there is anything to toggle.
    pub toggle_label: Option<String>,
    #[serde(skip)]
    pub toggle: ToggleExpand<Room>,
}

impl RoomCard {
    /// Press the card's show more / show less button.
    pub fn press_toggle(&self) -> bool {
        self.toggle_label.is_some() && self.toggle.toggle(&self.id)
    }
}

/// Presents rooms as cards with the first few variants.
#[derive(Debug, Clone)]
pub struct CardPresenter {
    collapsed_variants: usize,
}

impl CardPresenter {
    pub fn new(collapsed_variants: usize) -> Self {
        Self { collapsed_variants }
    }
}

impl ItemPresenter<Room> for CardPresenter {
    type Output = RoomCard;

    fn present(&self, room: &Room, on_toggle_expand: &ToggleExpand<Room>) -> RoomCard {
        let hidden = room.hidden_variant_count(self.collapsed_variants);
        let toggle_label = match (hidden, room.expanded) {
            (0, _) => None,
            (_, true) => Some("Show Less".to_string()),
            (n, false) => Some(format!("Show More ({n} more variants)")),
        };

        RoomCard {
            id: room.id,
            title: room.name.clone(),
            variants: room
                .visible_variants(self.collapsed_variants)
                .iter()
                .enumerate()
                .map(|(index, variant)| VariantLine::new(index, variant))
                .collect(),
            toggle_label,
            toggle: on_toggle_expand.clone(),
        }
    }
}
