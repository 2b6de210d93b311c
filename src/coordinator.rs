//! Playback coordinator: keeps a page's preview players behaving like a
//! playlist.
//!
//! In sequential mode (the default) starting one player stops and rewinds all
//! the others, preloads the next track, and finishing a track starts the one
//! with the next ordinal. [`PlaybackCoordinator::play_all`] switches to
//! concurrent mode for good: every player starts and nothing is paused or
//! chained anymore.
//!
//! No handler fails. A missing successor or an unknown target is a no-op.

use crate::platform::{PlayerEvent, PlayerEventKind, PlayerHandle, Preload, SharedPlayer};
use crate::{PreviewConfig, Result, DEFAULT_SEEK_RESUME_THRESHOLD};
use log::debug;
use std::fmt;

/// Mode flags consulted by the handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackMode {
    /// When true, a player starting does not pause the others
    pub allow_concurrent_playback: bool,
    /// When true, a finished player starts its successor
    pub auto_advance: bool,
}

impl PlaybackMode {
    /// One player at a time, advancing through ordinals
    pub const fn sequential() -> Self {
        Self {
            allow_concurrent_playback: false,
            auto_advance: true,
        }
    }

    /// Every player independent, no chaining
    pub const fn concurrent() -> Self {
        Self {
            allow_concurrent_playback: true,
            auto_advance: false,
        }
    }
}

impl Default for PlaybackMode {
    fn default() -> Self {
        Self::sequential()
    }
}

/// Coordinates an ordered, fixed collection of players.
pub struct PlaybackCoordinator {
    players: Vec<SharedPlayer>,
    mode: PlaybackMode,
    seek_resume_threshold: f64,
}

impl PlaybackCoordinator {
    /// Coordinator in sequential mode with the default seek threshold
    pub fn new(players: Vec<SharedPlayer>) -> Self {
        Self {
            players,
            mode: PlaybackMode::default(),
            seek_resume_threshold: DEFAULT_SEEK_RESUME_THRESHOLD,
        }
    }

    /// Coordinator in sequential mode using the threshold from `config`.
    ///
    /// Fails when `config` does not validate: a negative threshold would turn
    /// every rewind into a resume and break exclusive playback.
    pub fn with_config(players: Vec<SharedPlayer>, config: &PreviewConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            seek_resume_threshold: config.seek_resume_threshold,
            ..Self::new(players)
        })
    }

    /// Start in the given mode instead of sequential
    pub fn with_mode(mut self, mode: PlaybackMode) -> Self {
        self.mode = mode;
        self
    }

    /// Current mode; only `play_all` changes it
    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    /// Seeks landing above this position resume playback
    pub fn seek_resume_threshold(&self) -> f64 {
        self.seek_resume_threshold
    }

    /// Players in collection order
    pub fn players(&self) -> &[SharedPlayer] {
        &self.players
    }

    /// Number of coordinated players
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// True when there is nothing to coordinate
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Players whose ordinal follows `ordinal` by one.
    ///
    /// Linear scan on every call; pages hold a handful of previews.
    pub fn successors(&self, ordinal: u32) -> impl Iterator<Item = &SharedPlayer> + '_ {
        let next = ordinal.checked_add(1);
        self.players
            .iter()
            .filter(move |p| Some(p.ordinal()) == next)
    }

    /// Pointer entered a player: start buffering it.
    pub fn on_hover(&self, handle: &dyn PlayerHandle) {
        handle.set_preload(Preload::Auto);
    }

    /// A player started playing.
    ///
    /// Players are told apart by ordinal, so every player sharing the
    /// started player's ordinal is left untouched.
    pub fn on_playing(&self, handle: &dyn PlayerHandle) {
        if self.mode.allow_concurrent_playback {
            return;
        }
        let ordinal = handle.ordinal();
        for other in self.players.iter().filter(|p| p.ordinal() != ordinal) {
            other.seek(0.0);
            other.pause();
        }
        for next in self.successors(ordinal) {
            next.set_preload(Preload::Auto);
        }
    }

    /// A player reached the end of its media.
    pub fn on_ended(&self, handle: &dyn PlayerHandle) {
        handle.seek(0.0);
        if !self.mode.auto_advance {
            return;
        }
        let mut advanced = false;
        for next in self.successors(handle.ordinal()) {
            next.play();
            advanced = true;
        }
        if !advanced {
            debug!("player {} ended with no successor", handle.ordinal());
        }
    }

    /// A seek completed on a player.
    ///
    /// Only seeks landing past the threshold count as user seeks and resume
    /// playback; rewinds to zero issued by the other handlers are ignored.
    /// A user seek to within the threshold of zero is ignored as well.
    pub fn on_seeked(&self, handle: &dyn PlayerHandle) {
        if handle.current_position() > self.seek_resume_threshold {
            handle.play();
        }
    }

    /// Switch to concurrent mode and start every player from the beginning.
    ///
    /// There is no way back to sequential mode.
    pub fn play_all(&mut self) {
        self.mode = PlaybackMode::concurrent();
        debug!("play all: starting {} players", self.players.len());
        for player in &self.players {
            player.seek(0.0);
            player.play();
        }
    }

    /// Route an event to its handler. Unknown targets are ignored.
    pub fn dispatch(&self, event: PlayerEvent) {
        let Some(player) = self.players.get(event.target) else {
            debug!("dropping {:?} for unknown player #{}", event.kind, event.target);
            return;
        };
        let player = player.as_ref();
        match event.kind {
            PlayerEventKind::HoverEnter => self.on_hover(player),
            PlayerEventKind::Playing => self.on_playing(player),
            PlayerEventKind::Ended => self.on_ended(player),
            PlayerEventKind::Seeked => self.on_seeked(player),
        }
    }
}

impl fmt::Debug for PlaybackCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ordinals: Vec<u32> = self.players.iter().map(|p| p.ordinal()).collect();
        f.debug_struct("PlaybackCoordinator")
            .field("players", &ordinals)
            .field("mode", &self.mode)
            .field("seek_resume_threshold", &self.seek_resume_threshold)
            .finish()
    }
}
