//! Platform surface: the media primitives the coordinator drives.
//!
//! The coordinator only ever talks to players through [`PlayerHandle`], so a
//! page backend (a browser binding, a native audio element, the in-memory
//! [`SimulatedPlayer`]) can be swapped without touching playback logic.

pub mod media;

pub use media::{
    EventQueue, MediaState, PlayerEvent, PlayerEventKind, PlayerHandle, PlayerSnapshot, Preload,
    SimulatedPlayer,
};

use std::sync::Arc;

/// A player shared between its page and the coordinator
pub type SharedPlayer = Arc<dyn PlayerHandle>;
