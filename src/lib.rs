//! Audio preview playback coordination
//!
//! Coordinates a page's audio preview players so that sequential track
//! previews behave like a playlist: one preview plays at a time, the next
//! track is preloaded, and finishing a track starts the next one. A single
//! "play all" action switches the page to concurrent playback.
//!
//! # Features
//!
//! - **Toolkit-independent core**: the [`PlaybackCoordinator`] drives players
//!   through the [`platform::PlayerHandle`] trait only
//! - **Page discovery** (`html`, default): find preview players in rendered HTML
//! - **Session** (`session`, default): async facade over a worker thread that
//!   handles one event at a time
//!
//! # Example
//!
//! ```
//! use audiopreview::platform::{MediaState, PlayerHandle, SharedPlayer, SimulatedPlayer};
//! use audiopreview::PlaybackCoordinator;
//! use std::sync::Arc;
//!
//! let players: Vec<Arc<SimulatedPlayer>> =
//!     (0..3).map(|n| Arc::new(SimulatedPlayer::new(n))).collect();
//! let handles: Vec<SharedPlayer> = players.iter().map(|p| p.clone() as SharedPlayer).collect();
//! let coordinator = PlaybackCoordinator::new(handles);
//!
//! players[1].play();
//! coordinator.on_playing(players[1].as_ref());
//!
//! // The track runs out: rewind it and start its successor
//! players[1].finish();
//! coordinator.on_ended(players[1].as_ref());
//! assert_eq!(players[1].current_position(), 0.0);
//! assert_eq!(players[2].state(), MediaState::Playing);
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod coordinator;
pub use coordinator::{PlaybackCoordinator, PlaybackMode};

// Platform surface (player handles, lifecycle events, simulated players)
pub mod platform;

// Page discovery and the simulated page event loop
#[cfg(feature = "html")]
pub mod page;

// Async-friendly session (worker-thread backed)
#[cfg(all(feature = "html", feature = "session"))]
pub mod session;

#[cfg(all(feature = "html", feature = "session"))]
pub use session::PreviewSession;

use serde::{Deserialize, Serialize};

/// Default seek threshold separating programmatic rewinds from user seeks
pub const DEFAULT_SEEK_RESUME_THRESHOLD: f64 = 0.1;

/// Configuration for discovery and coordination
///
/// The defaults match the markup emitted by the catalog page renderer:
/// `<audio class="audiopreview" audiopreview_nb="N">` players and a
/// `<button id="play_all">` control.
///
/// # Examples
///
/// ```
/// let cfg = audiopreview::PreviewConfig::default();
/// assert_eq!(cfg.player_class, "audiopreview");
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Class name identifying preview players
    pub player_class: String,
    /// Attribute carrying each player's ordinal
    pub ordinal_attribute: String,
    /// Element id of the "play all" control
    pub play_all_id: String,
    /// Seeks landing strictly above this position (seconds) resume playback.
    ///
    /// A user seek to within this distance of zero is indistinguishable from
    /// the coordinator's own rewind and will not resume playback.
    pub seek_resume_threshold: f64,
    /// Maximum number of events handled per action before the rest is dropped
    pub max_cascade: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            player_class: "audiopreview".to_string(),
            ordinal_attribute: "audiopreview_nb".to_string(),
            play_all_id: "play_all".to_string(),
            seek_resume_threshold: DEFAULT_SEEK_RESUME_THRESHOLD,
            max_cascade: 1024,
        }
    }
}

impl PreviewConfig {
    /// Check that every field holds a usable value
    pub fn validate(&self) -> Result<()> {
        if self.player_class.trim().is_empty() {
            return Err(Error::ConfigError("player_class must not be empty".into()));
        }
        if self.ordinal_attribute.trim().is_empty() {
            return Err(Error::ConfigError("ordinal_attribute must not be empty".into()));
        }
        if self.play_all_id.trim().is_empty() {
            return Err(Error::ConfigError("play_all_id must not be empty".into()));
        }
        if !self.seek_resume_threshold.is_finite() || self.seek_resume_threshold < 0.0 {
            return Err(Error::ConfigError(format!(
                "seek_resume_threshold must be a non-negative number, got {}",
                self.seek_resume_threshold
            )));
        }
        if self.max_cascade == 0 {
            return Err(Error::ConfigError("max_cascade must be at least 1".into()));
        }
        Ok(())
    }
}
