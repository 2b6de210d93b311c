//! Media primitives for preview players: the handle capability set, the
//! lifecycle events a player emits, and an in-memory simulated player.
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Playback status of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaState {
    Playing,
    Paused,
    Ended,
}

/// Preload policy of a player, as carried by the `preload` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preload {
    None,
    Metadata,
    Auto,
}

impl Preload {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preload::None => "none",
            Preload::Metadata => "metadata",
            Preload::Auto => "auto",
        }
    }

    /// Parse an attribute value the way HTML does: empty means `auto`,
    /// unknown values fall back to `metadata`.
    pub fn from_attribute(value: &str) -> Self {
        value.parse().unwrap_or(Preload::Metadata)
    }
}

impl fmt::Display for Preload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preload {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Preload::Auto),
            "none" => Ok(Preload::None),
            "metadata" => Ok(Preload::Metadata),
            other => Err(format!("unknown preload value '{}'", other)),
        }
    }
}

/// Capability set the coordinator needs from a player.
///
/// Implementations use interior mutability: handles are shared between the
/// page that owns them and the coordinator that drives them.
pub trait PlayerHandle: Send + Sync {
    /// Stable ordinal of the player on its page (`audiopreview_nb`)
    fn ordinal(&self) -> u32;
    fn play(&self);
    fn pause(&self);
    /// Move the playback position, in seconds
    fn seek(&self, seconds: f64);
    fn current_position(&self) -> f64;
    fn set_preload(&self, preload: Preload);
    fn preload(&self) -> Preload;
    fn state(&self) -> MediaState;

    fn is_playing(&self) -> bool {
        self.state() == MediaState::Playing
    }

    /// Media source URL, when known
    fn source(&self) -> Option<String> {
        None
    }
}

/// Lifecycle and interaction events a player can fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerEventKind {
    /// Pointer entered the player
    HoverEnter,
    /// Player transitioned into playing status
    Playing,
    /// Playback reached the end of the media
    Ended,
    /// A seek completed
    Seeked,
}

/// An event addressed to a player by its index in the page's collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEvent {
    pub target: usize,
    pub kind: PlayerEventKind,
}

impl PlayerEvent {
    pub fn new(target: usize, kind: PlayerEventKind) -> Self {
        Self { target, kind }
    }
}

/// FIFO of pending player events, shared by every player of a page
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    inner: Arc<Mutex<VecDeque<PlayerEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: PlayerEvent) {
        lock(&self.inner).push_back(event);
    }

    pub fn pop(&self) -> Option<PlayerEvent> {
        lock(&self.inner).pop_front()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.inner).is_empty()
    }

    /// Drop every pending event, returning how many were discarded
    pub fn clear(&self) -> usize {
        let mut q = lock(&self.inner);
        let n = q.len();
        q.clear();
        n
    }
}

/// Point-in-time view of a player, used for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub ordinal: u32,
    pub preload: Preload,
    pub state: MediaState,
    pub position: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl PlayerSnapshot {
    pub fn capture(player: &dyn PlayerHandle) -> Self {
        Self {
            ordinal: player.ordinal(),
            preload: player.preload(),
            state: player.state(),
            position: player.current_position(),
            source: player.source(),
        }
    }
}

#[derive(Debug, Clone)]
struct PlayerState {
    status: MediaState,
    position: f64,
    preload: Preload,
}

/// In-memory player that behaves like a page media element.
///
/// When attached to an [`EventQueue`] it queues the `playing`, `seeked` and
/// `ended` events a browser would fire, so a coordinator can react to its own
/// mutations the same way it does on a live page.
pub struct SimulatedPlayer {
    ordinal: u32,
    index: usize,
    source: Option<String>,
    duration: Option<f64>,
    events: Option<EventQueue>,
    state: Mutex<PlayerState>,
}

impl SimulatedPlayer {
    /// A paused player at position 0 with `preload="none"`
    pub fn new(ordinal: u32) -> Self {
        SimulatedPlayer {
            ordinal,
            index: 0,
            source: None,
            duration: None,
            events: None,
            state: Mutex::new(PlayerState {
                status: MediaState::Paused,
                position: 0.0,
                preload: Preload::None,
            }),
        }
    }

    pub fn with_preload(self, preload: Preload) -> Self {
        lock(&self.state).preload = preload;
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds.max(0.0));
        self
    }

    pub fn with_source(mut self, src: impl Into<String>) -> Self {
        self.source = Some(src.into());
        self
    }

    /// Queue this player's lifecycle events on `events`, addressed to `index`
    pub fn with_events(mut self, index: usize, events: EventQueue) -> Self {
        self.index = index;
        self.events = Some(events);
        self
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Host side: the media reached its end while playing.
    ///
    /// Returns false (and changes nothing) when the player was not playing.
    pub fn finish(&self) -> bool {
        {
            let mut s = lock(&self.state);
            if s.status != MediaState::Playing {
                return false;
            }
            s.status = MediaState::Ended;
            if let Some(d) = self.duration {
                s.position = d;
            }
        }
        self.emit(PlayerEventKind::Ended);
        true
    }

    fn emit(&self, kind: PlayerEventKind) {
        if let Some(q) = &self.events {
            q.push(PlayerEvent::new(self.index, kind));
        }
    }
}

impl PlayerHandle for SimulatedPlayer {
    fn ordinal(&self) -> u32 {
        self.ordinal
    }

    fn play(&self) {
        {
            let mut s = lock(&self.state);
            match s.status {
                MediaState::Playing => return,
                MediaState::Ended => s.position = 0.0,
                MediaState::Paused => {}
            }
            s.status = MediaState::Playing;
        }
        self.emit(PlayerEventKind::Playing);
    }

    fn pause(&self) {
        let mut s = lock(&self.state);
        if s.status == MediaState::Playing {
            s.status = MediaState::Paused;
        }
    }

    fn seek(&self, seconds: f64) {
        {
            let mut s = lock(&self.state);
            let mut pos = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
            if let Some(d) = self.duration {
                pos = pos.min(d);
            }
            s.position = pos;
            if s.status == MediaState::Ended {
                s.status = MediaState::Paused;
            }
        }
        self.emit(PlayerEventKind::Seeked);
    }

    fn current_position(&self) -> f64 {
        lock(&self.state).position
    }

    fn set_preload(&self, preload: Preload) {
        lock(&self.state).preload = preload;
    }

    fn preload(&self) -> Preload {
        lock(&self.state).preload
    }

    fn state(&self) -> MediaState {
        lock(&self.state).status
    }

    fn source(&self) -> Option<String> {
        self.source.clone()
    }
}

// A poisoned lock only means a panic elsewhere; the state itself stays valid.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
