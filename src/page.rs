//! Preview pages: discovery of players in rendered HTML and an in-memory page
//! that feeds player events through a coordinator.
//!
//! Discovery follows the catalog markup:
//!
//! ```html
//! <audio class="audiopreview" audiopreview_nb="0" preload="auto" controls>
//!   <source src="/media/track0.mp3">
//! </audio>
//! <button id="play_all">play all</button>
//! ```

use crate::coordinator::PlaybackCoordinator;
use crate::platform::{
    EventQueue, PlayerEvent, PlayerEventKind, PlayerHandle, PlayerSnapshot, Preload, SharedPlayer,
    SimulatedPlayer,
};
use crate::{Error, PreviewConfig, Result};
use log::{debug, warn};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// A preview player found on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredPlayer {
    pub ordinal: u32,
    pub preload: Preload,
    pub source: Option<String>,
}

/// Result of scanning a page for preview players
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredPage {
    /// Players in document order
    pub players: Vec<DiscoveredPlayer>,
    /// Whether the page carries the "play all" control
    pub has_play_all: bool,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::ConfigError(format!("invalid selector '{}': {:?}", css, e)))
}

/// Find the preview players and the "play all" control in `html`.
///
/// Elements without a valid non-negative integer ordinal are skipped.
pub fn discover(html: &str, config: &PreviewConfig) -> Result<DiscoveredPage> {
    config.validate()?;
    let player_sel = selector(&format!(".{}", config.player_class))?;
    let play_all_sel = selector(&format!("#{}", config.play_all_id))?;
    let source_sel = selector("source[src]")?;

    let document = Html::parse_document(html);
    let mut players = Vec::new();
    for node in document.select(&player_sel) {
        let raw = node.value().attr(&config.ordinal_attribute);
        let Some(ordinal) = raw.and_then(|v| v.trim().parse::<u32>().ok()) else {
            warn!(
                "skipping preview player with invalid {}={:?}",
                config.ordinal_attribute, raw
            );
            continue;
        };
        let preload = node
            .value()
            .attr("preload")
            .map(Preload::from_attribute)
            .unwrap_or(Preload::Auto);
        players.push(DiscoveredPlayer {
            ordinal,
            preload,
            source: media_source(node, &source_sel),
        });
    }

    let has_play_all = document.select(&play_all_sel).next().is_some();
    debug!(
        "discovered {} preview players (play all control: {})",
        players.len(),
        has_play_all
    );
    Ok(DiscoveredPage {
        players,
        has_play_all,
    })
}

fn media_source(node: ElementRef<'_>, source_sel: &Selector) -> Option<String> {
    node.select(source_sel)
        .next()
        .and_then(|s| s.value().attr("src"))
        .or_else(|| node.value().attr("src"))
        .map(|s| s.to_string())
}

/// A user interaction on a preview page, addressed by player ordinal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UserAction {
    Hover { ordinal: u32 },
    Play { ordinal: u32 },
    Pause { ordinal: u32 },
    Seek { ordinal: u32, position: f64 },
    /// The track reached its end
    Finish { ordinal: u32 },
    /// Click on the "play all" control
    PlayAll,
}

/// Parse a JSON array of actions
pub fn parse_actions(json: &str) -> Result<Vec<UserAction>> {
    Ok(serde_json::from_str(json)?)
}

/// An in-memory page: simulated players wired to a coordinator.
///
/// Every action runs to completion: the events it triggers, and the events
/// those handlers trigger in turn, are handled one at a time in FIFO order
/// before `apply` returns.
pub struct SimulatedPage {
    players: Vec<Arc<SimulatedPlayer>>,
    coordinator: PlaybackCoordinator,
    events: EventQueue,
    has_play_all: bool,
    max_cascade: usize,
}

impl SimulatedPage {
    /// Build simulated players for an already discovered page.
    ///
    /// Fails when `config` does not validate.
    pub fn new(page: &DiscoveredPage, config: &PreviewConfig) -> Result<Self> {
        config.validate()?;
        let events = EventQueue::new();
        let players: Vec<Arc<SimulatedPlayer>> = page
            .players
            .iter()
            .enumerate()
            .map(|(index, p)| {
                let mut player = SimulatedPlayer::new(p.ordinal)
                    .with_preload(p.preload)
                    .with_events(index, events.clone());
                if let Some(src) = &p.source {
                    player = player.with_source(src.clone());
                }
                Arc::new(player)
            })
            .collect();
        let shared: Vec<SharedPlayer> = players.iter().map(|p| p.clone() as SharedPlayer).collect();
        Ok(Self {
            coordinator: PlaybackCoordinator::with_config(shared, config)?,
            players,
            events,
            has_play_all: page.has_play_all,
            max_cascade: config.max_cascade,
        })
    }

    /// Discover players in `html` and build a page around them
    pub fn from_html(html: &str, config: &PreviewConfig) -> Result<Self> {
        let page = discover(html, config)?;
        Self::new(&page, config)
    }

    /// Same as [`SimulatedPage::from_html`], reading the page from disk
    pub fn from_file(path: impl AsRef<Path>, config: &PreviewConfig) -> Result<Self> {
        let html = std::fs::read_to_string(path)?;
        Self::from_html(&html, config)
    }

    pub fn coordinator(&self) -> &PlaybackCoordinator {
        &self.coordinator
    }

    pub fn players(&self) -> &[Arc<SimulatedPlayer>] {
        &self.players
    }

    /// First player carrying `ordinal`
    pub fn player(&self, ordinal: u32) -> Option<&Arc<SimulatedPlayer>> {
        self.players.iter().find(|p| p.ordinal() == ordinal)
    }

    pub fn has_play_all(&self) -> bool {
        self.has_play_all
    }

    /// Apply one user action and handle every event it causes.
    ///
    /// Returns the number of events handled.
    pub fn apply(&mut self, action: &UserAction) -> usize {
        match *action {
            UserAction::PlayAll => {
                if self.has_play_all {
                    self.coordinator.play_all();
                } else {
                    warn!("ignoring play all: page has no play all control");
                }
            }
            UserAction::Hover { ordinal } => {
                for index in self.indices(ordinal) {
                    self.events
                        .push(PlayerEvent::new(index, PlayerEventKind::HoverEnter));
                }
            }
            UserAction::Play { ordinal } => self.each(ordinal, |p| p.play()),
            UserAction::Pause { ordinal } => self.each(ordinal, |p| p.pause()),
            UserAction::Seek { ordinal, position } => self.each(ordinal, |p| p.seek(position)),
            UserAction::Finish { ordinal } => self.each(ordinal, |p| {
                if !p.finish() {
                    debug!("player {} is not playing, nothing to finish", ordinal);
                }
            }),
        }
        self.run_until_idle()
    }

    /// Handle queued events until none are left or the cascade limit is hit.
    pub fn run_until_idle(&mut self) -> usize {
        let mut handled = 0;
        while handled < self.max_cascade {
            let Some(event) = self.events.pop() else {
                return handled;
            };
            self.coordinator.dispatch(event);
            handled += 1;
        }
        let dropped = self.events.clear();
        if dropped > 0 {
            warn!(
                "event cascade exceeded {} events, dropped {} pending",
                self.max_cascade, dropped
            );
        }
        handled
    }

    pub fn snapshot(&self) -> Vec<PlayerSnapshot> {
        self.players
            .iter()
            .map(|p| PlayerSnapshot::capture(p.as_ref()))
            .collect()
    }

    fn indices(&self, ordinal: u32) -> Vec<usize> {
        let found: Vec<usize> = self
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.ordinal() == ordinal)
            .map(|(i, _)| i)
            .collect();
        if found.is_empty() {
            debug!("no preview player with ordinal {}", ordinal);
        }
        found
    }

    fn each(&self, ordinal: u32, f: impl Fn(&SimulatedPlayer)) {
        for index in self.indices(ordinal) {
            f(self.players[index].as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MediaState;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><body><ul>
<li class="media_in_list"><audio class="audiopreview" audiopreview_nb="0" preload="auto" controls="true"><source src="/media/a.mp3"></audio></li>
<li class="media_in_list"><audio class="audiopreview" audiopreview_nb="1" preload="none" controls="true"><source src="/media/b.mp3"></audio></li>
<li class="media_in_list"><audio class="audiopreview" audiopreview_nb="2" preload="none" controls="true"><source src="/media/c.mp3"></audio></li>
</ul>
<button id="play_all">play all</button>
</body></html>"#;

    #[test]
    fn discovers_players_in_document_order() {
        let page = discover(PAGE, &PreviewConfig::default()).unwrap();
        assert!(page.has_play_all);
        let ordinals: Vec<u32> = page.players.iter().map(|p| p.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
        assert_eq!(page.players[0].preload, Preload::Auto);
        assert_eq!(page.players[1].preload, Preload::None);
        assert_eq!(page.players[2].source.as_deref(), Some("/media/c.mp3"));
    }

    #[test]
    fn skips_players_with_bad_ordinals() {
        let html = r#"<audio class="audiopreview" audiopreview_nb="x"></audio>
<audio class="audiopreview"></audio>
<audio class="audiopreview" audiopreview_nb="-1"></audio>
<audio class="audiopreview" audiopreview_nb=" 4 " src="/direct.ogg"></audio>"#;
        let page = discover(html, &PreviewConfig::default()).unwrap();
        assert_eq!(page.players.len(), 1);
        assert_eq!(page.players[0].ordinal, 4);
        assert_eq!(page.players[0].preload, Preload::Auto);
        assert_eq!(page.players[0].source.as_deref(), Some("/direct.ogg"));
        assert!(!page.has_play_all);
    }

    #[test]
    fn invalid_class_is_a_config_error() {
        let cfg = PreviewConfig {
            player_class: "[broken".into(),
            ..Default::default()
        };
        assert!(matches!(discover(PAGE, &cfg), Err(Error::ConfigError(_))));
    }

    #[test]
    fn play_cascade_leaves_one_player_playing() {
        let mut page = SimulatedPage::from_html(PAGE, &PreviewConfig::default()).unwrap();
        page.apply(&UserAction::Play { ordinal: 0 });
        page.apply(&UserAction::Seek { ordinal: 0, position: 20.0 });
        let handled = page.apply(&UserAction::Play { ordinal: 2 });
        assert!(handled >= 1);

        let snap = page.snapshot();
        assert_eq!(snap[2].state, MediaState::Playing);
        assert_eq!(snap[0].state, MediaState::Paused);
        assert_eq!(snap[0].position, 0.0);
        assert_eq!(snap[1].state, MediaState::Paused);
    }

    #[test]
    fn play_all_requires_control() {
        let html = r#"<audio class="audiopreview" audiopreview_nb="0"></audio>
<audio class="audiopreview" audiopreview_nb="1"></audio>"#;
        let mut page = SimulatedPage::from_html(html, &PreviewConfig::default()).unwrap();
        page.apply(&UserAction::PlayAll);
        assert!(page.snapshot().iter().all(|s| s.state == MediaState::Paused));
        assert!(!page.coordinator().mode().allow_concurrent_playback);
    }

    #[test]
    fn unknown_ordinal_is_ignored() {
        let mut page = SimulatedPage::from_html(PAGE, &PreviewConfig::default()).unwrap();
        assert_eq!(page.apply(&UserAction::Play { ordinal: 42 }), 0);
        assert!(page.player(42).is_none());
    }

    #[test]
    fn cascade_limit_drops_excess_events() {
        let cfg = PreviewConfig {
            max_cascade: 1,
            ..Default::default()
        };
        let mut page = SimulatedPage::from_html(PAGE, &cfg).unwrap();
        page.apply(&UserAction::Play { ordinal: 0 });
        // Only the first queued event is handled, the rest is dropped
        assert_eq!(page.apply(&UserAction::PlayAll), 1);
        assert_eq!(page.run_until_idle(), 0);
    }

    #[test]
    fn new_rejects_invalid_config() {
        let found = discover(PAGE, &PreviewConfig::default()).unwrap();
        for cfg in [
            PreviewConfig {
                seek_resume_threshold: -1.0,
                ..Default::default()
            },
            PreviewConfig {
                max_cascade: 0,
                ..Default::default()
            },
        ] {
            assert!(matches!(
                SimulatedPage::new(&found, &cfg),
                Err(Error::ConfigError(_))
            ));
        }
    }

    #[test]
    fn new_with_valid_config_keeps_one_player_playing() {
        let found = discover(PAGE, &PreviewConfig::default()).unwrap();
        let mut page = SimulatedPage::new(&found, &PreviewConfig::default()).unwrap();
        page.apply(&UserAction::Play { ordinal: 0 });
        let handled = page.apply(&UserAction::Play { ordinal: 1 });
        assert!(handled < PreviewConfig::default().max_cascade);
        let playing = page
            .snapshot()
            .iter()
            .filter(|s| s.state == MediaState::Playing)
            .count();
        assert_eq!(playing, 1);
    }

    #[test]
    fn missing_page_file_is_an_io_error() {
        let res = SimulatedPage::from_file("/nonexistent/page.html", &PreviewConfig::default());
        assert!(matches!(res, Err(Error::Io(_))));
    }

    #[test]
    fn actions_parse_from_json() {
        let actions = parse_actions(
            r#"[{"action":"hover","ordinal":1},{"action":"seek","ordinal":1,"position":3.5},{"action":"play_all"}]"#,
        )
        .unwrap();
        assert_eq!(
            actions,
            vec![
                UserAction::Hover { ordinal: 1 },
                UserAction::Seek { ordinal: 1, position: 3.5 },
                UserAction::PlayAll,
            ]
        );
        assert!(matches!(parse_actions("{"), Err(Error::ParseError(_))));
    }
}
