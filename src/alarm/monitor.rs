use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use log::{debug, error, info, warn};
use url::Url;

use crate::alarm::model::Alarm;
use crate::clock::Clock;
use crate::countdown::Countdown;
use crate::events::{ClockEvent, EventSender};
use crate::player::{PlaybackState, Player, PlayerError, PlayerEvent, Playlist};

pub const DEFAULT_FALLBACK_TIMEOUT_SECS: u32 = 20;
pub const FALLBACK_VOLUME: u8 = 50;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MonitorState {
    /// No alarm being supervised
    Idle,
    /// Alarm dispatched, waiting for the player to come up
    ExpectingAlarm,
    /// Player confirmed it is playing the alarm
    AlarmActive,
    /// Alarm media failed, looping the fallback sound
    FallBackMode,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MonitorState::Idle => "idle",
            MonitorState::ExpectingAlarm => "expecting alarm",
            MonitorState::AlarmActive => "alarm active",
            MonitorState::FallBackMode => "fallback",
        };
        f.write_str(text)
    }
}

/// Supervises the player after an alarm fired so the user wakes up even when
/// the alarm media is unavailable.
///
/// The fallback countdown runs exactly while the state is
/// [`MonitorState::ExpectingAlarm`].
pub struct AlarmMonitor {
    player: Box<dyn Player>,
    countdown: Countdown,
    fallback_timeout: Duration,
    fallback: Playlist,
    state: MonitorState,
    events: EventSender,
}

impl AlarmMonitor {
    pub fn new(
        player: Box<dyn Player>,
        clock: Arc<dyn Clock>,
        events: EventSender,
        fallback_timeout: Duration,
        fallback_media: Url,
    ) -> Self {
        Self {
            player,
            countdown: Countdown::new(clock),
            fallback_timeout,
            fallback: Playlist::looped(vec![fallback_media]),
            state: MonitorState::Idle,
            events,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn alarm_triggered(&mut self, alarm: &Alarm) {
        info!("supervising alarm {} ({})", alarm.id(), alarm.media());
        self.set_state(MonitorState::ExpectingAlarm);
        self.countdown.arm(self.fallback_timeout);
        if let Err(err) = self.start_alarm(alarm) {
            warn!("player rejected alarm media: {err}");
            self.trigger_fallback();
        }
    }

    pub fn player_event(&mut self, event: &PlayerEvent) {
        match event {
            PlayerEvent::StateChanged(state) => self.playback_state_changed(*state),
            PlayerEvent::Error(err) => self.player_error(err),
        }
    }

    pub fn player_error(&mut self, err: &PlayerError) {
        match self.state {
            MonitorState::ExpectingAlarm | MonitorState::AlarmActive => {
                warn!("player error while alarm {}: {err}", self.state);
                self.trigger_fallback();
            }
            MonitorState::FallBackMode => error!("fallback alarm reported an error: {err}"),
            MonitorState::Idle => debug!("ignoring player error while idle: {err}"),
        }
    }

    pub fn playback_state_changed(&mut self, playback: PlaybackState) {
        match (self.state, playback) {
            (MonitorState::ExpectingAlarm, PlaybackState::Playing) => {
                self.countdown.cancel();
                self.set_state(MonitorState::AlarmActive);
            }
            (MonitorState::AlarmActive, PlaybackState::Stopped) => {
                self.set_state(MonitorState::Idle);
            }
            _ => {}
        }
    }

    /// Ends supervision once the grace period passed without an error.
    pub fn poll(&mut self) {
        if self.countdown.poll() && self.state == MonitorState::ExpectingAlarm {
            debug!("no player error within grace period");
            self.set_state(MonitorState::Idle);
        }
    }

    /// User interaction: stop supervising regardless of state.
    pub fn stop(&mut self) {
        self.countdown.cancel();
        self.set_state(MonitorState::Idle);
    }

    /// Stops the player as well; used when the device goes to standby.
    pub fn silence(&mut self) {
        self.stop();
        if let Err(err) = self.player.stop() {
            warn!("unable to stop player: {err}");
        }
    }

    fn start_alarm(&mut self, alarm: &Alarm) -> Result<(), PlayerError> {
        self.player.set_media(alarm.media())?;
        self.player.set_volume(alarm.volume())?;
        self.player.play()
    }

    fn trigger_fallback(&mut self) {
        self.countdown.cancel();
        self.set_state(MonitorState::FallBackMode);
        if let Err(err) = self.start_fallback() {
            error!("unable to start fallback alarm: {err}");
        }
    }

    fn start_fallback(&mut self) -> Result<(), PlayerError> {
        self.player.set_playlist(&self.fallback)?;
        self.player.set_volume(FALLBACK_VOLUME)?;
        self.player.play()
    }

    fn set_state(&mut self, next: MonitorState) {
        if next == self.state {
            return;
        }
        debug!("alarm monitor: {} -> {next}", self.state);
        self.state = next;
        self.events.emit(ClockEvent::MonitorStateChanged(next));
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;
    use crate::alarm::model::Period;
    use crate::clock::{MockClock, parse_local_datetime};
    use crate::events::EventQueue;
    use crate::player::mock::{PlayerCommand, RecordingPlayer};

    const FALLBACK_MEDIA: &str = "file:///usr/share/roosterd/TempleBell.mp3";

    struct Fixture {
        clock: Arc<MockClock>,
        player: RecordingPlayer,
        queue: EventQueue,
        monitor: AlarmMonitor,
    }

    fn fixture(player: RecordingPlayer) -> Fixture {
        let clock = Arc::new(MockClock::at(
            parse_local_datetime("2020-11-18T08:45:00").expect("valid datetime"),
        ));
        let queue = EventQueue::new();
        let monitor = AlarmMonitor::new(
            Box::new(player.clone()),
            clock.clone(),
            queue.sender(),
            Duration::seconds(i64::from(DEFAULT_FALLBACK_TIMEOUT_SECS)),
            Url::parse(FALLBACK_MEDIA).expect("url"),
        );
        Fixture {
            clock,
            player,
            queue,
            monitor,
        }
    }

    fn alarm() -> Alarm {
        let mut alarm = Alarm::new(
            Url::parse("http://st01.dlf.de/dlf/01/128/mp3/stream.mp3").expect("url"),
            NaiveTime::from_hms_opt(8, 45, 0).expect("time"),
            Period::Daily,
            Duration::minutes(30),
        );
        alarm.set_volume(35);
        alarm
    }

    fn fallback_commands() -> Vec<PlayerCommand> {
        vec![
            PlayerCommand::SetPlaylist(Playlist::looped(vec![
                Url::parse(FALLBACK_MEDIA).expect("url"),
            ])),
            PlayerCommand::SetVolume(FALLBACK_VOLUME),
            PlayerCommand::Play,
        ]
    }

    fn states(queue: &EventQueue) -> Vec<MonitorState> {
        queue
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                ClockEvent::MonitorStateChanged(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn plays_alarm_media_at_alarm_volume() {
        let mut f = fixture(RecordingPlayer::default());
        let alarm = alarm();
        f.monitor.alarm_triggered(&alarm);

        assert_eq!(f.monitor.state(), MonitorState::ExpectingAlarm);
        assert_eq!(
            f.player.commands(),
            vec![
                PlayerCommand::SetMedia(alarm.media().clone()),
                PlayerCommand::SetVolume(35),
                PlayerCommand::Play,
            ]
        );
    }

    #[test]
    fn player_error_switches_to_fallback() {
        let mut f = fixture(RecordingPlayer::default());
        f.monitor.alarm_triggered(&alarm());
        f.clock.advance(Duration::seconds(3));
        f.monitor.player_error(&PlayerError::Network("stream unreachable".to_string()));

        assert_eq!(f.monitor.state(), MonitorState::FallBackMode);
        assert_eq!(f.player.commands()[3..].to_vec(), fallback_commands());

        // the grace period passing afterwards changes nothing
        f.clock.advance(Duration::seconds(30));
        f.monitor.poll();
        assert_eq!(f.monitor.state(), MonitorState::FallBackMode);
        assert_eq!(
            states(&f.queue),
            vec![MonitorState::ExpectingAlarm, MonitorState::FallBackMode]
        );
    }

    #[test]
    fn error_in_fallback_mode_does_not_restart_fallback() {
        let mut f = fixture(RecordingPlayer::default());
        f.monitor.alarm_triggered(&alarm());
        f.monitor.player_error(&PlayerError::Resource("404".to_string()));
        let issued = f.player.commands().len();
        f.monitor.player_error(&PlayerError::Resource("again".to_string()));

        assert_eq!(f.monitor.state(), MonitorState::FallBackMode);
        assert_eq!(f.player.commands().len(), issued);
    }

    #[test]
    fn clean_playback_never_falls_back() {
        let mut f = fixture(RecordingPlayer::default());
        f.monitor.alarm_triggered(&alarm());
        f.monitor.player_event(&PlayerEvent::StateChanged(PlaybackState::Playing));
        assert_eq!(f.monitor.state(), MonitorState::AlarmActive);
        f.monitor.player_event(&PlayerEvent::StateChanged(PlaybackState::Stopped));

        assert_eq!(f.monitor.state(), MonitorState::Idle);
        assert_eq!(
            states(&f.queue),
            vec![
                MonitorState::ExpectingAlarm,
                MonitorState::AlarmActive,
                MonitorState::Idle
            ]
        );
        assert!(
            !f.player
                .commands()
                .iter()
                .any(|command| matches!(command, PlayerCommand::SetPlaylist(_)))
        );
    }

    #[test]
    fn error_while_active_still_falls_back() {
        let mut f = fixture(RecordingPlayer::default());
        f.monitor.alarm_triggered(&alarm());
        f.monitor.playback_state_changed(PlaybackState::Playing);
        f.monitor.player_event(&PlayerEvent::Error(PlayerError::Network("dropped".to_string())));
        assert_eq!(f.monitor.state(), MonitorState::FallBackMode);
    }

    #[test]
    fn grace_period_elapsing_returns_to_idle() {
        let mut f = fixture(RecordingPlayer::default());
        f.monitor.alarm_triggered(&alarm());
        f.clock.advance(Duration::seconds(19));
        f.monitor.poll();
        assert_eq!(f.monitor.state(), MonitorState::ExpectingAlarm);

        f.clock.advance(Duration::seconds(1));
        f.monitor.poll();
        assert_eq!(f.monitor.state(), MonitorState::Idle);

        f.monitor.player_error(&PlayerError::Network("late".to_string()));
        assert_eq!(f.monitor.state(), MonitorState::Idle);
    }

    #[test]
    fn rejected_media_goes_straight_to_fallback() {
        let mut f = fixture(RecordingPlayer::rejecting_media());
        f.monitor.alarm_triggered(&alarm());

        assert_eq!(f.monitor.state(), MonitorState::FallBackMode);
        assert_eq!(f.player.commands(), fallback_commands());
    }

    #[test]
    fn stop_forces_idle_from_any_state() {
        let mut f = fixture(RecordingPlayer::default());
        f.monitor.alarm_triggered(&alarm());
        f.monitor.stop();
        assert_eq!(f.monitor.state(), MonitorState::Idle);

        f.monitor.alarm_triggered(&alarm());
        f.monitor.player_error(&PlayerError::Format("ogg".to_string()));
        f.monitor.stop();
        assert_eq!(f.monitor.state(), MonitorState::Idle);

        // a stopped monitor ignores a stale grace period
        f.clock.advance(Duration::minutes(1));
        f.monitor.poll();
        assert_eq!(f.monitor.state(), MonitorState::Idle);
    }

    #[test]
    fn silence_stops_player() {
        let mut f = fixture(RecordingPlayer::default());
        f.monitor.alarm_triggered(&alarm());
        f.monitor.silence();
        assert_eq!(f.monitor.state(), MonitorState::Idle);
        assert_eq!(f.player.commands().last(), Some(&PlayerCommand::Stop));
    }
}
