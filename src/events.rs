use std::sync::mpsc::{self, Receiver, Sender};

use chrono::Duration;
use log::debug;

use crate::alarm::model::Alarm;
use crate::alarm::monitor::MonitorState;
use crate::player::PlayerEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum ClockEvent {
    /// Alarm list mutated in the store (add, delete or edit).
    AlarmsChanged,
    UpcomingAlarmInfoChanged(String),
    AlarmTriggered(Alarm),
    MonitorStateChanged(MonitorState),
    SleepTimerElapsed,
    /// Minutes until standby.
    RemainingTimeChanged(i64),
    SleepTimeoutChanged(Duration),
    Player(PlayerEvent),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<ClockEvent>,
}

impl EventSender {
    pub fn emit(&self, event: ClockEvent) {
        if let Err(err) = self.tx.send(event) {
            debug!("event queue closed, dropping {:?}", err.0);
        }
    }
}

/// The one logical queue all components publish into. Events are handled in
/// the order they were emitted, one at a time.
pub struct EventQueue {
    tx: Sender<ClockEvent>,
    rx: Receiver<ClockEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    pub fn try_next(&self) -> Option<ClockEvent> {
        self.rx.try_recv().ok()
    }

    pub fn drain(&self) -> Vec<ClockEvent> {
        self.rx.try_iter().collect()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
