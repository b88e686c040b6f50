//! Lazily loaded media.
//!
//! A [`LazyMedia`] controller gates the start of an image or video load on
//! its element becoming visible, and for video keeps following visibility to
//! pause and resume playback.

mod config;
mod lazy;
mod types;

pub use config::MediaConfig;
pub use lazy::{LazyMedia, LazyMediaBuilder, MediaCompletion};
pub use types::*;
