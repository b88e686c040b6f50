//! Headless scroll session.
//!
//! Lays the catalog out as a fixed-geometry list, scrolls through it one
//! step at a time and writes every rendered frame.

use std::collections::{HashMap, HashSet};
use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use roomview_core::{
    catalog::Room,
    geometry::Rect,
    media::{LazyMedia, MediaConfig, MediaElement, MediaState, PlaybackError},
    view::{CatalogFrame, CatalogView},
    visibility::{ElementId, VisibilityTracker},
};

use crate::presenter::{CardPresenter, RoomCard};

const VIEWPORT_WIDTH: f32 = 1200.0;
const VIEWPORT_HEIGHT: f32 = 900.0;
const HEADER_HEIGHT: f32 = 60.0;
const VARIANT_HEIGHT: f32 = 260.0;
const MEDIA_HEIGHT: f32 = 200.0;
const TOGGLE_HEIGHT: f32 = 48.0;
const ROOM_GAP: f32 = 32.0;
const SENTINEL_HEIGHT: f32 = 64.0;

/// Fraction of the viewport scrolled per step.
const SCROLL_STEP: f32 = 0.8;
const MAX_STEPS: usize = 1000;
const MAX_RETRIES: usize = 3;

const SENTINEL: ElementId = ElementId(0);

fn media_element(room_id: u32, index: usize) -> ElementId {
    ElementId(u64::from(room_id) * 1000 + index as u64 + 1)
}

/// How frames are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

/// Stand-in for an image or video element.
#[derive(Debug)]
struct SimulatedMedia {
    element: ElementId,
}

impl MediaElement for SimulatedMedia {
    fn begin_load(&mut self, url: &str) {
        debug!(element = self.element.0, url, "Loading media");
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        trace!(element = self.element.0, "Playing video");
        Ok(())
    }

    fn pause(&mut self) {
        trace!(element = self.element.0, "Pausing video");
    }
}

#[derive(Debug, Clone, Copy)]
struct RowLayout {
    top: f32,
    bottom: f32,
}

#[derive(Debug, Default, Clone, Copy, Serialize)]
struct MediaTally {
    pending: usize,
    loading: usize,
    loaded: usize,
    failed: usize,
}

#[derive(Serialize)]
struct FrameDump<'a> {
    step: usize,
    scroll_offset: f32,
    content_height: f32,
    revision: u64,
    rooms: usize,
    loading: bool,
    error_banner: Option<&'a str>,
    exhausted_notice: Option<&'a str>,
    skeletons: usize,
    media: MediaTally,
    visible_rooms: Vec<&'a RoomCard>,
}

/// What a finished session did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub steps: usize,
    pub rooms: usize,
    pub exhausted: bool,
}

pub struct ScrollSession<W> {
    tracker: VisibilityTracker,
    view: CatalogView<Room, CardPresenter>,
    media_config: MediaConfig,
    media: HashMap<ElementId, LazyMedia>,
    rows: Vec<RowLayout>,
    content_height: f32,
    format: OutputFormat,
    out: W,
    step: usize,
}

impl<W: Write> ScrollSession<W> {
    pub fn new(
        view: CatalogView<Room, CardPresenter>,
        media_config: MediaConfig,
        format: OutputFormat,
        out: W,
    ) -> Self {
        Self {
            tracker: VisibilityTracker::new(Rect::new(0.0, 0.0, VIEWPORT_WIDTH, VIEWPORT_HEIGHT)),
            view,
            media_config,
            media: HashMap::new(),
            rows: Vec::new(),
            content_height: 0.0,
            format,
            out,
            step: 0,
        }
    }

    /// Scroll to the end of the catalog.
    pub async fn run(mut self) -> Result<SessionSummary> {
        self.view
            .mount(&self.tracker, SENTINEL)
            .context("Failed to attach the end-of-list sentinel")?;

        let mut expanded_once = false;
        let mut retries = 0;

        while self.step < MAX_STEPS {
            self.settle().await;
            let frame = self.view.render();
            self.layout(&frame);
            self.view.commit_layout();
            self.complete_media();
            self.emit(&frame)?;
            self.step += 1;

            // Exercise show more once, on the first room that has it
            if !expanded_once {
                if let Some(card) = frame.items.iter().find(|c| c.toggle_label.is_some()) {
                    expanded_once = card.press_toggle();
                    if expanded_once {
                        info!(room = card.id, "Expanded room variants");
                        continue;
                    }
                }
            }

            let controller = self.view.controller();
            if controller.is_fetching() {
                continue;
            }

            if self.at_bottom() {
                if controller.is_exhausted() {
                    break;
                }
                if controller.last_error().is_some() {
                    if retries == MAX_RETRIES {
                        warn!(retries, "Giving up after repeated page failures");
                        break;
                    }
                    retries += 1;
                    info!(attempt = retries, "Retrying page load");
                    self.view.controller().load_next_page().await;
                    continue;
                }
            }

            self.scroll();
            if self.view.controller().is_fetching() {
                let frame = self.view.render();
                self.emit(&frame)?;
            }
        }

        if self.step >= MAX_STEPS {
            warn!(steps = self.step, "Step limit reached before the end of the catalog");
        }

        let controller = self.view.controller();
        let summary = SessionSummary {
            steps: self.step,
            rooms: controller.displayed_len(),
            exhausted: controller.is_exhausted(),
        };
        self.view.unmount();
        self.media.clear();
        info!(
            steps = summary.steps,
            rooms = summary.rooms,
            exhausted = summary.exhausted,
            "Session finished"
        );
        Ok(summary)
    }

    /// Wait for any in-flight page to settle.
    async fn settle(&mut self) {
        while self.view.controller().is_fetching() {
            if !self.view.changed().await {
                break;
            }
        }
    }

    fn scroll_offset(&self) -> f32 {
        self.tracker.viewport().y
    }

    fn max_offset(&self) -> f32 {
        (self.content_height - VIEWPORT_HEIGHT).max(0.0)
    }

    fn at_bottom(&self) -> bool {
        self.scroll_offset() >= self.max_offset()
    }

    fn scroll(&mut self) {
        let target = (self.scroll_offset() + VIEWPORT_HEIGHT * SCROLL_STEP).min(self.max_offset());
        trace!(offset = target, "Scrolling");
        self.tracker.scroll_to(target);
    }

    /// Position rows, media elements and the sentinel for `frame`.
    fn layout(&mut self, frame: &CatalogFrame<RoomCard>) {
        let mut y = 0.0;
        let mut live = HashSet::new();
        self.rows.clear();

        for card in &frame.items {
            let top = y;
            y += HEADER_HEIGHT;
            for line in &card.variants {
                let element = media_element(card.id, line.index);
                live.insert(element);
                self.tracker
                    .set_element_bounds(element, Rect::new(0.0, y, VIEWPORT_WIDTH, MEDIA_HEIGHT));

                if let Some(media) = &line.media {
                    if !self.media.contains_key(&element) {
                        let lazy = LazyMedia::attach(
                            &self.tracker,
                            element,
                            media.clone(),
                            &self.media_config,
                            Box::new(SimulatedMedia { element }),
                        );
                        self.media.insert(element, lazy);
                    }
                }
                y += VARIANT_HEIGHT;
            }
            if card.toggle_label.is_some() {
                y += TOGGLE_HEIGHT;
            }
            self.rows.push(RowLayout { top, bottom: y });
            y += ROOM_GAP;
        }

        // Variants hidden by "Show Less" lose their media
        let stale: Vec<ElementId> = self
            .media
            .keys()
            .filter(|element| !live.contains(element))
            .copied()
            .collect();
        for element in stale {
            self.media.remove(&element);
            self.tracker.remove_element(element);
        }

        self.tracker
            .set_element_bounds(SENTINEL, Rect::new(0.0, y, VIEWPORT_WIDTH, SENTINEL_HEIGHT));
        self.content_height = y + SENTINEL_HEIGHT;
    }

    /// Report every requested media load as finished.
    fn complete_media(&self) {
        for lazy in self.media.values() {
            if lazy.state() == MediaState::Loading {
                lazy.on_load();
            }
        }
    }

    fn tally(&self) -> MediaTally {
        let mut tally = MediaTally::default();
        for lazy in self.media.values() {
            match lazy.state() {
                MediaState::Pending => tally.pending += 1,
                MediaState::Loading => tally.loading += 1,
                MediaState::Loaded => tally.loaded += 1,
                MediaState::Failed => tally.failed += 1,
            }
        }
        tally
    }

    fn visible_cards<'a>(&self, frame: &'a CatalogFrame<RoomCard>) -> Vec<&'a RoomCard> {
        let viewport = self.tracker.viewport();
        frame
            .items
            .iter()
            .zip(&self.rows)
            .filter(|(_, row)| row.bottom > viewport.y && row.top < viewport.bottom())
            .map(|(card, _)| card)
            .collect()
    }

    fn emit(&mut self, frame: &CatalogFrame<RoomCard>) -> Result<()> {
        let written = match self.format {
            OutputFormat::Json => self.emit_json(frame),
            OutputFormat::Text => self.emit_text(frame),
        };
        written.context("Failed to write frame")
    }

    fn emit_json(&mut self, frame: &CatalogFrame<RoomCard>) -> Result<()> {
        let dump = FrameDump {
            step: self.step,
            scroll_offset: self.scroll_offset(),
            content_height: self.content_height,
            revision: frame.revision,
            rooms: frame.items.len(),
            loading: frame.loading,
            error_banner: frame.error_banner.as_deref(),
            exhausted_notice: frame.exhausted_notice.as_deref(),
            skeletons: frame.skeletons,
            media: self.tally(),
            visible_rooms: self.visible_cards(frame),
        };
        let line = serde_json::to_string(&dump)?;
        writeln!(self.out, "{line}")?;
        Ok(())
    }

    fn emit_text(&mut self, frame: &CatalogFrame<RoomCard>) -> Result<()> {
        let tally = self.tally();
        let mut text = format!(
            "-- step {} | scroll {:.0}/{:.0} | rooms {} | media {} loaded, {} loading, {} pending, {} failed\n",
            self.step,
            self.scroll_offset(),
            self.max_offset(),
            frame.items.len(),
            tally.loaded,
            tally.loading,
            tally.pending,
            tally.failed,
        );

        if let Some(banner) = &frame.error_banner {
            text.push_str(&format!("  ! {banner}\n"));
        }
        for _ in 0..frame.skeletons {
            text.push_str("  [..........]\n");
        }

        for card in self.visible_cards(frame) {
            text.push_str(&format!("  {}\n", card.title));
            for line in &card.variants {
                let state = self
                    .media
                    .get(&media_element(card.id, line.index))
                    .map(|lazy| format!("{:?}", lazy.state()).to_lowercase())
                    .unwrap_or_else(|| "no media".to_string());
                text.push_str(&format!(
                    "    [{state}] {} | {} bed | {} adults | RM {} (was RM {}, -{}%)\n",
                    line.name, line.bed, line.capacity, line.price, line.original_price, line.discount
                ));
            }
            if let Some(label) = &card.toggle_label {
                text.push_str(&format!("    < {label} >\n"));
            }
        }

        if frame.loading {
            text.push_str(&format!("  {}\n", self.view.config().loading_message));
        }
        if let Some(notice) = &frame.exhausted_notice {
            text.push_str(&format!("  {notice}\n"));
        }

        self.out.write_all(text.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use roomview_core::{
        generate_rooms,
        pagination::{PaginationConfig, PaginationController},
        view::ViewConfig,
        MockRoomSource,
    };

    async fn run_session(rooms: usize, failure_rate: f64) -> (SessionSummary, Vec<serde_json::Value>) {
        let source = MockRoomSource::new(generate_rooms(rooms, 9), 9).with_failure_rate(failure_rate);
        let controller =
            PaginationController::<Room>::initialize(Arc::new(source), PaginationConfig::default())
                .await;
        let config = ViewConfig::default();
        let view = CatalogView::new(controller, CardPresenter::new(config.collapsed_variants), config);

        let mut out = Vec::new();
        let summary = ScrollSession::new(view, MediaConfig::default(), OutputFormat::Json, &mut out)
            .run()
            .await
            .unwrap();

        let frames = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        (summary, frames)
    }

    #[tokio::test]
    async fn test_session_scrolls_to_exhaustion() {
        let (summary, frames) = run_session(25, 0.0).await;

        assert!(summary.exhausted);
        assert_eq!(summary.rooms, 25);

        let last = frames.last().unwrap();
        assert_eq!(last["rooms"], 25);
        assert_eq!(last["exhausted_notice"], "No more rooms to load");
        assert_eq!(last["media"]["loading"], 0);
        assert!(frames.iter().any(|frame| frame["loading"] == true));
    }

    #[tokio::test]
    async fn test_session_gives_up_on_failing_source() {
        let (summary, frames) = run_session(25, 1.0).await;

        assert!(!summary.exhausted);
        assert_eq!(summary.rooms, 0);
        assert!(frames
            .iter()
            .any(|frame| frame["error_banner"] == "Failed to load more rooms. Please try again."));
    }

    #[test]
    fn test_output_format_from_env_value() {
        assert_eq!(OutputFormat::from_env_value(Some("JSON")), OutputFormat::Json);
        assert_eq!(OutputFormat::from_env_value(Some("text")), OutputFormat::Text);
        assert_eq!(OutputFormat::from_env_value(None), OutputFormat::Text);
    }
}
