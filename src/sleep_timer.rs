use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use log::{debug, info};

use crate::alarm::model::Alarm;
use crate::clock::Clock;
use crate::countdown::Countdown;
use crate::events::{ClockEvent, EventSender};
use crate::player::PlaybackState;
use crate::store::{StoreError, TimeoutStore};

pub const REMAINING_TIME_POLL_SECS: i64 = 30;

/// What armed the running countdown.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Activity {
    Idle,
    Alarm,
    Playing,
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Activity::Idle => "idle",
            Activity::Alarm => "alarm",
            Activity::Playing => "playing",
        };
        f.write_str(text)
    }
}

/// Returns the device to standby after a period without activity.
///
/// An alarm arms its own timeout and ordinary playback cannot shorten it until
/// that countdown elapsed.
pub struct SleepTimer {
    store: Arc<dyn TimeoutStore>,
    events: EventSender,
    countdown: Countdown,
    ticker: Countdown,
    activity: Activity,
}

impl SleepTimer {
    pub fn new(store: Arc<dyn TimeoutStore>, clock: Arc<dyn Clock>, events: EventSender) -> Self {
        Self {
            store,
            events,
            countdown: Countdown::new(Arc::clone(&clock)),
            ticker: Countdown::new(clock),
            activity: Activity::Idle,
        }
    }

    pub fn playback_state_changed(&mut self, state: PlaybackState) {
        if state != PlaybackState::Playing {
            return;
        }
        if self.activity == Activity::Alarm {
            debug!("playback started during alarm, keeping alarm timeout");
            return;
        }
        self.reset_timer();
    }

    pub fn alarm_triggered(&mut self, alarm: &Alarm) {
        info!(
            "sleep timer armed for alarm {} ({} min)",
            alarm.id(),
            alarm.timeout().num_minutes()
        );
        self.start(alarm.timeout(), Activity::Alarm);
    }

    /// User interaction: restart the countdown with the configured sleep
    /// timeout.
    pub fn reset_timer(&mut self) {
        self.start(self.store.get_sleep_timeout(), Activity::Playing);
    }

    pub fn poll(&mut self) {
        if self.countdown.poll() {
            info!(
                "sleep timer elapsed after {} min of {} activity",
                self.countdown.interval().num_minutes(),
                self.activity
            );
            self.ticker.cancel();
            self.activity = Activity::Idle;
            self.events.emit(ClockEvent::SleepTimerElapsed);
            self.publish_remaining();
            return;
        }
        if self.ticker.poll() {
            self.ticker.arm(Duration::seconds(REMAINING_TIME_POLL_SECS));
            self.publish_remaining();
        }
    }

    /// Persists the new timeout and applies it to a running playback
    /// countdown. An alarm window keeps the alarm's own timeout.
    pub fn set_sleep_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        self.store.set_sleep_timeout(timeout)?;
        info!("sleep timeout set to {} min", timeout.num_minutes());
        self.events.emit(ClockEvent::SleepTimeoutChanged(timeout));
        if self.activity == Activity::Playing && self.countdown.is_active() {
            self.countdown.arm(timeout);
            self.publish_remaining();
        }
        Ok(())
    }

    /// Whole minutes until standby, 0 when nothing is running.
    pub fn get_remaining_time(&self) -> i64 {
        self.countdown
            .remaining()
            .map_or(0, |remaining| remaining.num_minutes())
    }

    pub fn get_sleep_timeout(&self) -> Duration {
        self.store.get_sleep_timeout()
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    fn start(&mut self, timeout: Duration, activity: Activity) {
        self.activity = activity;
        self.countdown.arm(timeout);
        self.ticker.arm(Duration::seconds(REMAINING_TIME_POLL_SECS));
        self.publish_remaining();
    }

    fn publish_remaining(&self) {
        self.events
            .emit(ClockEvent::RemainingTimeChanged(self.get_remaining_time()));
    }
}
