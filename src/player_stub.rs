use log::info;
use url::Url;

use crate::events::{ClockEvent, EventSender};
use crate::player::{PlaybackState, Player, PlayerError, PlayerEvent, Playlist};

/// Stand-in for hosts without an audio backend. Every command is logged and
/// accepted; `play`/`stop` report the matching state change back through the
/// event queue the way a real backend would.
pub struct LogPlayer {
    events: EventSender,
    volume: u8,
    source: Option<String>,
}

impl LogPlayer {
    pub fn new(events: EventSender) -> Self {
        Self {
            events,
            volume: 0,
            source: None,
        }
    }

    fn report(&self, state: PlaybackState) {
        self.events
            .emit(ClockEvent::Player(PlayerEvent::StateChanged(state)));
    }
}

impl Player for LogPlayer {
    fn set_media(&mut self, media: &Url) -> Result<(), PlayerError> {
        info!("player: media {media}");
        self.source = Some(media.to_string());
        Ok(())
    }

    fn set_playlist(&mut self, playlist: &Playlist) -> Result<(), PlayerError> {
        let first = playlist
            .items()
            .first()
            .ok_or_else(|| PlayerError::Resource("empty playlist".to_string()))?;
        info!(
            "player: playlist of {} item(s), looped={}",
            playlist.items().len(),
            playlist.is_looped()
        );
        self.source = Some(first.to_string());
        Ok(())
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), PlayerError> {
        info!("player: volume {volume}");
        self.volume = volume;
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        let Some(source) = self.source.as_deref() else {
            return Err(PlayerError::Resource("nothing to play".to_string()));
        };
        info!("player: playing {source} at volume {}", self.volume);
        self.report(PlaybackState::Playing);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), PlayerError> {
        info!("player: stop");
        self.report(PlaybackState::Stopped);
        Ok(())
    }
}
