use std::path::PathBuf;

use chrono::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::alarm::model::Alarm;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("alarm {0} not found")]
    NotFound(Uuid),
    #[error("alarm {0} already exists")]
    AlreadyExists(Uuid),
    #[error("invalid timeout {0} minutes, expected > 0")]
    InvalidTimeout(i64),
    #[error("unable to write configuration file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to serialize configuration")]
    Json(#[from] serde_json::Error),
}

/// Owner of the canonical alarm collection. Readers receive clones; edits go
/// through [`AlarmStore::update`] so the store can announce them.
pub trait AlarmStore: Send + Sync {
    fn add(&self, alarm: Alarm) -> Result<(), StoreError>;
    fn delete(&self, id: Uuid) -> Result<(), StoreError>;
    fn get(&self, id: Uuid) -> Result<Alarm, StoreError>;
    fn list(&self) -> Vec<Alarm>;
    fn update(&self, id: Uuid, edit: &mut dyn FnMut(&mut Alarm) -> bool)
    -> Result<(), StoreError>;
}

pub trait TimeoutStore: Send + Sync {
    /// Default for alarms that carry no timeout of their own.
    fn get_alarm_timeout(&self) -> Duration;
    fn get_sleep_timeout(&self) -> Duration;
    fn set_sleep_timeout(&self, timeout: Duration) -> Result<(), StoreError>;
}
