use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use log::{debug, info, warn};
use uuid::Uuid;

use crate::alarm::scheduler::{TimeDisplayMode, find_upcoming, format_upcoming};
use crate::clock::Clock;
use crate::countdown::Countdown;
use crate::events::{ClockEvent, EventSender};
use crate::store::AlarmStore;

/// Keeps exactly one countdown armed for the soonest enabled alarm in the
/// store and emits [`ClockEvent::AlarmTriggered`] when it elapses.
pub struct AlarmDispatcher {
    store: Arc<dyn AlarmStore>,
    clock: Arc<dyn Clock>,
    events: EventSender,
    countdown: Countdown,
    upcoming: Option<Uuid>,
    upcoming_info: String,
    display_mode: TimeDisplayMode,
}

impl AlarmDispatcher {
    pub fn new(
        store: Arc<dyn AlarmStore>,
        clock: Arc<dyn Clock>,
        events: EventSender,
        display_mode: TimeDisplayMode,
    ) -> Self {
        Self {
            store,
            countdown: Countdown::new(Arc::clone(&clock)),
            clock,
            events,
            upcoming: None,
            upcoming_info: String::new(),
            display_mode,
        }
    }

    /// Re-selects the soonest alarm and re-arms the countdown for it.
    pub fn check_alarms(&mut self) {
        let now = self.clock.now();
        self.arm_for_upcoming(&now);
    }

    /// Fires the countdown if it has elapsed. Returns whether it did.
    pub fn poll(&mut self) -> bool {
        if !self.countdown.poll() {
            return false;
        }
        self.trigger();
        true
    }

    pub fn get_remaining_time(&self) -> Option<Duration> {
        self.countdown.remaining()
    }

    pub fn get_upcoming_alarm_info(&self) -> &str {
        &self.upcoming_info
    }

    pub fn upcoming_alarm(&self) -> Option<Uuid> {
        self.upcoming
    }

    fn trigger(&mut self) {
        let now = self.clock.now();
        if let Some(id) = self.upcoming {
            match self.store.get(id) {
                Ok(alarm) if alarm.is_enabled() => {
                    info!("alarm {id} triggered at {now}");
                    self.events.emit(ClockEvent::AlarmTriggered(alarm));
                }
                Ok(_) => debug!("alarm {id} was disabled before it fired"),
                Err(err) => warn!("upcoming alarm vanished before it fired: {err}"),
            }
        }
        // the alarm that just fired must not be selected again for this minute
        self.arm_for_upcoming(&(now + Duration::seconds(1)));
    }

    fn arm_for_upcoming(&mut self, reference: &NaiveDateTime) {
        let alarms = self.store.list();
        match find_upcoming(&alarms, reference) {
            Some((alarm, instant)) => {
                if self.upcoming != Some(alarm.id()) {
                    info!("next alarm {} at {instant}", alarm.id());
                }
                self.upcoming = Some(alarm.id());
                self.countdown.arm_until(instant);
                self.publish_info(format_upcoming(Some(instant), self.display_mode));
            }
            None => {
                if self.upcoming.take().is_some() || self.countdown.is_active() {
                    info!("no enabled alarm, dispatcher idle");
                }
                self.countdown.cancel();
                self.publish_info(format_upcoming(None, self.display_mode));
            }
        }
    }

    fn publish_info(&mut self, info: String) {
        if info == self.upcoming_info {
            return;
        }
        self.upcoming_info = info.clone();
        self.events.emit(ClockEvent::UpcomingAlarmInfoChanged(info));
    }
}
