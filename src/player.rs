use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum PlayerError {
    #[error("media resource could not be resolved: {0}")]
    Resource(String),
    #[error("media format not supported: {0}")]
    Format(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("player backend unavailable: {0}")]
    Backend(String),
}

/// Asynchronous notifications reported by the audio backend.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PlayerEvent {
    StateChanged(PlaybackState),
    Error(PlayerError),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Playlist {
    items: Vec<Url>,
    looped: bool,
}

impl Playlist {
    pub fn looped(items: Vec<Url>) -> Self {
        Self {
            items,
            looped: true,
        }
    }

    pub fn items(&self) -> &[Url] {
        &self.items
    }

    pub fn is_looped(&self) -> bool {
        self.looped
    }
}

/// Commands accepted by the audio backend. Failures to accept a command are
/// returned directly; failures during playback arrive later as
/// [`PlayerEvent::Error`].
pub trait Player: Send {
    fn set_media(&mut self, media: &Url) -> Result<(), PlayerError>;
    fn set_playlist(&mut self, playlist: &Playlist) -> Result<(), PlayerError>;
    fn set_volume(&mut self, volume: u8) -> Result<(), PlayerError>;
    fn play(&mut self) -> Result<(), PlayerError>;
    fn stop(&mut self) -> Result<(), PlayerError>;
}
