use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result, bail};
use chrono::Duration;
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::alarm::model::Alarm;
use crate::events::{ClockEvent, EventSender};
use crate::store::{AlarmStore, StoreError, TimeoutStore};

pub const DEFAULT_ALARM_TIMEOUT_MINUTES: i64 = 30;
pub const DEFAULT_SLEEP_TIMEOUT_MINUTES: i64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    pub alarm_timeout: Duration,
    pub sleep_timeout: Duration,
    pub alarms: Vec<Alarm>,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            alarm_timeout: Duration::minutes(DEFAULT_ALARM_TIMEOUT_MINUTES),
            sleep_timeout: Duration::minutes(DEFAULT_SLEEP_TIMEOUT_MINUTES),
            alarms: Vec::new(),
        }
    }
}

/// JSON-file backed store for alarms and timeouts. Without a path it keeps
/// everything in memory. Every mutation is written back (when a path is set)
/// and announced as [`ClockEvent::AlarmsChanged`].
pub struct ConfigStore {
    path: Option<PathBuf>,
    document: Mutex<ConfigDocument>,
    events: Option<EventSender>,
}

impl ConfigStore {
    pub fn in_memory(document: ConfigDocument) -> Self {
        Self {
            path: None,
            document: Mutex::new(document),
            events: None,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("unable to read configuration file {}", path.display()))?;
        let document = parse_config_text(&content)?;
        info!(
            "loaded {} alarm(s) from {}",
            document.alarms.len(),
            path.display()
        );
        Ok(Self {
            path: Some(path.to_path_buf()),
            document: Mutex::new(document),
            events: None,
        })
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    pub fn snapshot(&self) -> ConfigDocument {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, ConfigDocument> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `edit` to a copy of the document. The copy replaces the live
    /// document only after it was written, so a failed write leaves the store
    /// unchanged. `edit` returns whether anything changed.
    fn apply(
        &self,
        alarms_changed: bool,
        edit: impl FnOnce(&mut ConfigDocument) -> Result<bool, StoreError>,
    ) -> Result<(), StoreError> {
        {
            let mut guard = self.lock();
            let mut staged = guard.clone();
            if !edit(&mut staged)? {
                return Ok(());
            }
            if let Some(path) = self.path.as_deref() {
                save_config(path, &staged)?;
                debug!("configuration written to {}", path.display());
            }
            *guard = staged;
        }
        if alarms_changed && let Some(events) = &self.events {
            events.emit(ClockEvent::AlarmsChanged);
        }
        Ok(())
    }
}

impl AlarmStore for ConfigStore {
    fn add(&self, alarm: Alarm) -> Result<(), StoreError> {
        self.apply(true, |document| {
            if document.alarms.iter().any(|known| known.id() == alarm.id()) {
                return Err(StoreError::AlreadyExists(alarm.id()));
            }
            info!("adding alarm {}", alarm.id());
            document.alarms.push(alarm);
            Ok(true)
        })
    }

    fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.apply(true, |document| {
            let index = document
                .alarms
                .iter()
                .position(|alarm| alarm.id() == id)
                .ok_or(StoreError::NotFound(id))?;
            document.alarms.remove(index);
            info!("deleted alarm {id}");
            Ok(true)
        })
    }

    fn get(&self, id: Uuid) -> Result<Alarm, StoreError> {
        self.lock()
            .alarms
            .iter()
            .find(|alarm| alarm.id() == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn list(&self) -> Vec<Alarm> {
        self.lock().alarms.clone()
    }

    fn update(
        &self,
        id: Uuid,
        edit: &mut dyn FnMut(&mut Alarm) -> bool,
    ) -> Result<(), StoreError> {
        self.apply(true, |document| {
            let alarm = document
                .alarms
                .iter_mut()
                .find(|alarm| alarm.id() == id)
                .ok_or(StoreError::NotFound(id))?;
            let changed = edit(alarm);
            if changed {
                debug!("alarm {id} changed");
            }
            Ok(changed)
        })
    }
}

impl TimeoutStore for ConfigStore {
    fn get_alarm_timeout(&self) -> Duration {
        self.lock().alarm_timeout
    }

    fn get_sleep_timeout(&self) -> Duration {
        self.lock().sleep_timeout
    }

    fn set_sleep_timeout(&self, timeout: Duration) -> Result<(), StoreError> {
        if timeout <= Duration::zero() {
            return Err(StoreError::InvalidTimeout(timeout.num_minutes()));
        }
        self.apply(false, |document| {
            document.sleep_timeout = timeout;
            Ok(true)
        })
    }
}

pub fn parse_config_text(content: &str) -> Result<ConfigDocument> {
    let raw = serde_json::from_str::<ConfigFile>(content).map_err(|err| {
        let line = err.line();
        let column = err.column();
        anyhow::anyhow!("invalid JSON at line {line}, column {column}: {err}")
    })?;

    let alarm_timeout = timeout_minutes("AlarmTimeout", raw.alarm_timeout)?;
    let sleep_timeout = timeout_minutes("SleepTimeout", raw.sleep_timeout)?;

    let mut ids = HashSet::new();
    let mut alarms = Vec::with_capacity(raw.alarms.len());
    for (index, value) in raw.alarms.iter().enumerate() {
        let alarm = match Alarm::from_json(value, alarm_timeout) {
            Ok(alarm) => alarm,
            Err(err) => {
                warn!("skipping alarm #{index}: {err}");
                continue;
            }
        };
        if !ids.insert(alarm.id()) {
            warn!("skipping alarm #{index}: duplicate alarm id {}", alarm.id());
            continue;
        }
        alarms.push(alarm);
    }

    Ok(ConfigDocument {
        alarm_timeout,
        sleep_timeout,
        alarms,
    })
}

fn timeout_minutes(key: &str, minutes: i64) -> Result<Duration> {
    if minutes <= 0 {
        bail!("{key} must be > 0 minutes, got {minutes}");
    }
    match Duration::try_minutes(minutes) {
        Some(timeout) => Ok(timeout),
        None => bail!("{key} of {minutes} minutes is out of range"),
    }
}

pub fn save_config(path: &Path, document: &ConfigDocument) -> Result<(), StoreError> {
    let alarms = document
        .alarms
        .iter()
        .map(Alarm::to_json)
        .collect::<Vec<_>>();
    let payload = json!({
        "AlarmTimeout": document.alarm_timeout.num_minutes(),
        "SleepTimeout": document.sleep_timeout.num_minutes(),
        "Alarms": alarms,
    });
    let text = serde_json::to_string_pretty(&payload)?;
    fs::write(path, format!("{text}\n")).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(rename = "AlarmTimeout", default = "default_alarm_timeout_minutes")]
    alarm_timeout: i64,
    #[serde(rename = "SleepTimeout", default = "default_sleep_timeout_minutes")]
    sleep_timeout: i64,
    #[serde(rename = "Alarms", default)]
    alarms: Vec<Value>,
}

fn default_alarm_timeout_minutes() -> i64 {
    DEFAULT_ALARM_TIMEOUT_MINUTES
}

fn default_sleep_timeout_minutes() -> i64 {
    DEFAULT_SLEEP_TIMEOUT_MINUTES
}
