use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use chrono::{Duration, NaiveTime};
use log::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::alarm::dispatcher::AlarmDispatcher;
use crate::alarm::model::{Alarm, Period};
use crate::alarm::monitor::{AlarmMonitor, MonitorState};
use crate::alarm::scheduler::TimeDisplayMode;
use crate::clock::Clock;
use crate::config::ConfigStore;
use crate::events::{ClockEvent, EventQueue};
use crate::player::{Player, PlayerEvent};
use crate::sleep_timer::SleepTimer;
use crate::store::{AlarmStore, StoreError, TimeoutStore};

pub struct RuntimeSettings {
    pub fallback_timeout: Duration,
    pub fallback_media: Url,
    pub display_mode: TimeDisplayMode,
}

type Observer = Box<dyn FnMut(&ClockEvent)>;

/// Cooperative event loop owning every alarm component. Timers are polled
/// against the clock, then queued events are routed one at a time until the
/// queue is empty.
pub struct Runtime {
    queue: EventQueue,
    store: Arc<ConfigStore>,
    dispatcher: AlarmDispatcher,
    monitor: AlarmMonitor,
    sleep_timer: SleepTimer,
    observers: Vec<Observer>,
}

impl Runtime {
    /// `store` and `player` are expected to publish into `queue`.
    pub fn new(
        queue: EventQueue,
        store: Arc<ConfigStore>,
        clock: Arc<dyn Clock>,
        player: Box<dyn Player>,
        settings: RuntimeSettings,
    ) -> Self {
        let mut dispatcher = AlarmDispatcher::new(
            store.clone(),
            Arc::clone(&clock),
            queue.sender(),
            settings.display_mode,
        );
        let monitor = AlarmMonitor::new(
            player,
            Arc::clone(&clock),
            queue.sender(),
            settings.fallback_timeout,
            settings.fallback_media,
        );
        let sleep_timer = SleepTimer::new(store.clone(), clock, queue.sender());
        dispatcher.check_alarms();
        Self {
            queue,
            store,
            dispatcher,
            monitor,
            sleep_timer,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&ClockEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Polls all countdowns and handles every event that results. Returns the
    /// number of events handled.
    pub fn process_pending(&mut self) -> usize {
        self.dispatcher.poll();
        self.monitor.poll();
        self.sleep_timer.poll();

        let mut handled = 0;
        while let Some(event) = self.queue.try_next() {
            self.route(&event);
            for observer in &mut self.observers {
                observer(&event);
            }
            handled += 1;
        }
        handled
    }

    /// Runs until `deadline` passes, or forever without one.
    pub fn run(&mut self, tick: StdDuration, deadline: Option<Instant>) {
        info!("runtime started, tick {} ms", tick.as_millis());
        loop {
            self.process_pending();
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                break;
            }
            std::thread::sleep(tick);
        }
        info!("runtime stopped");
    }

    fn route(&mut self, event: &ClockEvent) {
        debug!("event: {event:?}");
        match event {
            ClockEvent::AlarmsChanged => self.dispatcher.check_alarms(),
            ClockEvent::AlarmTriggered(alarm) => {
                self.monitor.alarm_triggered(alarm);
                self.sleep_timer.alarm_triggered(alarm);
            }
            ClockEvent::Player(player_event) => {
                self.monitor.player_event(player_event);
                if let PlayerEvent::StateChanged(state) = player_event {
                    self.sleep_timer.playback_state_changed(*state);
                }
            }
            ClockEvent::SleepTimerElapsed => {
                info!("no activity, entering standby");
                self.monitor.silence();
            }
            ClockEvent::UpcomingAlarmInfoChanged(info) => info!("upcoming alarm: {info}"),
            ClockEvent::MonitorStateChanged(_)
            | ClockEvent::RemainingTimeChanged(_)
            | ClockEvent::SleepTimeoutChanged(_) => {}
        }
    }

    /// Creates an enabled alarm using the configured default alarm timeout.
    pub fn new_alarm(
        &self,
        media: Url,
        time: NaiveTime,
        period: Period,
    ) -> Result<Uuid, StoreError> {
        let alarm = Alarm::new(media, time, period, self.store.get_alarm_timeout());
        let id = alarm.id();
        self.store.add(alarm)?;
        Ok(id)
    }

    pub fn delete_alarm(&self, id: Uuid) -> Result<(), StoreError> {
        self.store.delete(id)
    }

    pub fn reschedule_alarm(
        &self,
        id: Uuid,
        time: NaiveTime,
        period: Period,
    ) -> Result<(), StoreError> {
        self.store.update(id, &mut |alarm| {
            let time_changed = alarm.set_time(time);
            alarm.set_period(period) || time_changed
        })
    }

        pub fn set_alarm_enabled(&self, id: Uuid, enabled: bool) -> Result<(), StoreError> {
        self.store.update(id, &mut |alarm| alarm.set_enabled(enabled))
    }

    pub fn set_sleep_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        self.sleep_timer.set_sleep_timeout(timeout)
    }

    pub fn reset_sleep_timer(&mut self) {
        self.sleep_timer.reset_timer();
    }

    /// User acknowledged the alarm.
    pub fn stop_alarm(&mut self) {
        info!("alarm stopped by user");
        self.monitor.silence();
    }

    /// Entry point for the audio backend's asynchronous notifications.
    pub fn player_event(&self, event: PlayerEvent) {
        self.queue.sender().emit(ClockEvent::Player(event));
    }

    pub fn upcoming_alarm_info(&self) -> &str {
        self.dispatcher.get_upcoming_alarm_info()
    }

    pub fn time_to_next_alarm(&self) -> Option<Duration> {
        self.dispatcher.get_remaining_time()
    }

    pub fn sleep_remaining_minutes(&self) -> i64 {
        self.sleep_timer.get_remaining_time()
    }

    pub fn sleep_timeout(&self) -> Duration {
        self.sleep_timer.get_sleep_timeout()
    }

    pub fn monitor_state(&self) -> MonitorState {
        self.monitor.state()
    }
}
