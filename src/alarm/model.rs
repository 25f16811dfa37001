use std::fmt;

use chrono::{Duration, NaiveTime, Timelike};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

pub const DEFAULT_ALARM_VOLUME: u8 = 30;
pub const MAX_VOLUME: u8 = 100;

/// Malformed alarm input. All variants are "invalid argument" conditions raised
/// while reading persisted alarms; the scheduler never sees these values.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum AlarmParseError {
    #[error("malformed alarm entry: {0}")]
    Malformed(String),
    #[error("invalid alarm id '{0}', expected UUID")]
    InvalidId(String),
    #[error("invalid media url '{0}'")]
    InvalidUrl(String),
    #[error("invalid time '{0}', expected hh:mm")]
    InvalidTime(String),
    #[error("unknown alarm period '{0}', expected once, daily, weekend or workdays")]
    InvalidPeriod(String),
    #[error("invalid alarmTimeout {0}, expected minutes > 0")]
    InvalidTimeout(i64),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Period {
    /// Next time the time of day occurs (within 24 hours)
    Once,
    Daily,
    /// Saturdays and Sundays
    Weekend,
    /// Monday through Friday
    Workdays,
}

impl Period {
    pub fn as_token(self) -> &'static str {
        match self {
            Period::Once => "once",
            Period::Daily => "daily",
            Period::Weekend => "weekend",
            Period::Workdays => "workdays",
        }
    }

    pub fn from_token(token: &str) -> Result<Self, AlarmParseError> {
        match token.trim().to_ascii_lowercase().as_str() {
            "once" => Ok(Period::Once),
            "daily" => Ok(Period::Daily),
            "weekend" => Ok(Period::Weekend),
            "workdays" => Ok(Period::Workdays),
            _ => Err(AlarmParseError::InvalidPeriod(token.to_string())),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// One alarm definition. The id is fixed at creation; everything else is
/// mutated through setters that report whether the value actually changed.
#[derive(Debug, Clone, PartialEq)]
pub struct Alarm {
    id: Uuid,
    time: NaiveTime,
    period: Period,
    enabled: bool,
    media: Url,
    volume: u8,
    timeout: Duration,
}

impl Alarm {
    /// Factory default: enabled, default volume, fresh random id.
    pub fn new(media: Url, time: NaiveTime, period: Period, timeout: Duration) -> Self {
        Self::with_id(Uuid::new_v4(), media, time, period, timeout)
    }

    pub fn with_id(
        id: Uuid,
        media: Url,
        time: NaiveTime,
        period: Period,
        timeout: Duration,
    ) -> Self {
        Self {
            id,
            time: truncate_to_minute(time),
            period,
            enabled: true,
            media,
            volume: DEFAULT_ALARM_VOLUME,
            timeout,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn media(&self) -> &Url {
        &self.media
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_time(&mut self, time: NaiveTime) -> bool {
        replace_if_changed(&mut self.time, truncate_to_minute(time))
    }

    pub fn set_period(&mut self, period: Period) -> bool {
        replace_if_changed(&mut self.period, period)
    }

    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        replace_if_changed(&mut self.enabled, enabled)
    }

    pub fn set_media(&mut self, media: Url) -> bool {
        replace_if_changed(&mut self.media, media)
    }

    /// Volume is clamped to 0..=100.
    pub fn set_volume(&mut self, volume: u8) -> bool {
        replace_if_changed(&mut self.volume, volume.min(MAX_VOLUME))
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> bool {
        replace_if_changed(&mut self.timeout, timeout)
    }

    /// Reads one persisted alarm object. `default_timeout` applies when the
    /// entry carries no `alarmTimeout`.
    pub fn from_json(value: &Value, default_timeout: Duration) -> Result<Self, AlarmParseError> {
        let raw = AlarmFile::deserialize(value)
            .map_err(|err| AlarmParseError::Malformed(err.to_string()))?;

        let id = Uuid::parse_str(raw.id.trim())
            .map_err(|_| AlarmParseError::InvalidId(raw.id.clone()))?;
        let media =
            Url::parse(raw.url.trim()).map_err(|_| AlarmParseError::InvalidUrl(raw.url.clone()))?;
        let time = parse_time_of_day(&raw.time)?;
        let period = Period::from_token(&raw.period)?;
        let timeout = match raw.alarm_timeout {
            Some(minutes) if minutes <= 0 => return Err(AlarmParseError::InvalidTimeout(minutes)),
            Some(minutes) => {
                Duration::try_minutes(minutes).ok_or(AlarmParseError::InvalidTimeout(minutes))?
            }
            None => default_timeout,
        };

        let mut alarm = Alarm::with_id(id, media, time, period, timeout);
        alarm.enabled = raw.enabled;
        alarm.volume = raw
            .volume
            .map(|volume| volume.clamp(0, i64::from(MAX_VOLUME)) as u8)
            .unwrap_or(DEFAULT_ALARM_VOLUME);
        Ok(alarm)
    }

    pub fn to_json(&self) -> Value {
        let mut alarm_obj = Map::new();
        alarm_obj.insert("id".to_string(), Value::String(self.id.to_string()));
        alarm_obj.insert(
            "period".to_string(),
            Value::String(self.period.as_token().to_string()),
        );
        alarm_obj.insert(
            "time".to_string(),
            Value::String(self.time.format("%H:%M").to_string()),
        );
        alarm_obj.insert("enabled".to_string(), Value::Bool(self.enabled));
        alarm_obj.insert("url".to_string(), Value::String(self.media.to_string()));
        alarm_obj.insert("volume".to_string(), Value::Number(self.volume.into()));
        alarm_obj.insert(
            "alarmTimeout".to_string(),
            Value::Number(self.timeout.num_minutes().into()),
        );
        Value::Object(alarm_obj)
    }
}

fn replace_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

fn parse_time_of_day(input: &str) -> Result<NaiveTime, AlarmParseError> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M")
        .map_err(|_| AlarmParseError::InvalidTime(input.to_string()))
}

#[derive(Debug, Deserialize)]
struct AlarmFile {
    id: String,
    period: String,
    time: String,
    url: String,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    volume: Option<i64>,
    #[serde(default, rename = "alarmTimeout")]
    alarm_timeout: Option<i64>,
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn default_timeout() -> Duration {
        Duration::minutes(30)
    }

    #[test]
    fn parses_complete_alarm() {
        let value = json!({
            "id": "247c4f9d-1d2b-4d5e-9b1b-3bd1b6ddc1a4",
            "period": "workdays",
            "time": "06:30",
            "enabled": false,
            "url": "http://st01.dlf.de/dlf/01/128/mp3/stream.mp3",
            "volume": 45,
            "alarmTimeout": 10
        });

        let alarm = Alarm::from_json(&value, default_timeout()).expect("valid alarm");
        assert_eq!(
            alarm.id().to_string(),
            "247c4f9d-1d2b-4d5e-9b1b-3bd1b6ddc1a4"
        );
        assert_eq!(alarm.period(), Period::Workdays);
        assert_eq!(alarm.time(), NaiveTime::from_hms_opt(6, 30, 0).expect("time"));
        assert!(!alarm.is_enabled());
        assert_eq!(alarm.volume(), 45);
        assert_eq!(alarm.timeout(), Duration::minutes(10));
        assert_eq!(alarm.media().host_str(), Some("st01.dlf.de"));
    }

    #[test]
    fn missing_optional_fields_use_defaults() {
        let value = json!({
            "id": "0b1e5c2a-4d3e-4f60-8a7b-9c0d1e2f3a4b",
            "period": "daily",
            "time": "07:15",
            "url": "https://www.heise.de"
        });

        let alarm = Alarm::from_json(&value, Duration::minutes(42)).expect("valid alarm");
        assert!(alarm.is_enabled());
        assert_eq!(alarm.volume(), DEFAULT_ALARM_VOLUME);
        assert_eq!(alarm.timeout(), Duration::minutes(42));
    }

    #[test]
    fn volume_out_of_range_is_clamped() {
        let value = json!({
            "id": "0b1e5c2a-4d3e-4f60-8a7b-9c0d1e2f3a4b",
            "period": "once",
            "time": "07:15",
            "url": "https://www.heise.de",
            "volume": 250
        });

        let alarm = Alarm::from_json(&value, default_timeout()).expect("valid alarm");
        assert_eq!(alarm.volume(), MAX_VOLUME);
    }

    #[test]
    fn rejects_invalid_uuid() {
        let value = json!({
            "id": "not-a-uuid",
            "period": "daily",
            "time": "07:15",
            "url": "https://www.heise.de"
        });
        let err = Alarm::from_json(&value, default_timeout()).expect_err("bad id");
        assert_eq!(err, AlarmParseError::InvalidId("not-a-uuid".to_string()));
    }

    #[test]
    fn rejects_invalid_url() {
        let value = json!({
            "id": "0b1e5c2a-4d3e-4f60-8a7b-9c0d1e2f3a4b",
            "period": "daily",
            "time": "07:15",
            "url": "no scheme here"
        });
        let err = Alarm::from_json(&value, default_timeout()).expect_err("bad url");
        assert!(matches!(err, AlarmParseError::InvalidUrl(_)));
    }

    #[test]
    fn rejects_invalid_time_and_period() {
        let bad_time = json!({
            "id": "0b1e5c2a-4d3e-4f60-8a7b-9c0d1e2f3a4b",
            "period": "daily",
            "time": "25:61",
            "url": "https://www.heise.de"
        });
        let err = Alarm::from_json(&bad_time, default_timeout()).expect_err("bad time");
        assert!(matches!(err, AlarmParseError::InvalidTime(_)));

        let bad_period = json!({
            "id": "0b1e5c2a-4d3e-4f60-8a7b-9c0d1e2f3a4b",
            "period": "fortnightly",
            "time": "07:15",
            "url": "https://www.heise.de"
        });
        let err = Alarm::from_json(&bad_period, default_timeout()).expect_err("bad period");
        assert!(err.to_string().contains("fortnightly"));
    }

    #[test]
    fn missing_url_is_malformed() {
        let value = json!({
            "id": "0b1e5c2a-4d3e-4f60-8a7b-9c0d1e2f3a4b",
            "period": "daily",
            "time": "07:15"
        });
        let err = Alarm::from_json(&value, default_timeout()).expect_err("missing url");
        assert!(matches!(err, AlarmParseError::Malformed(_)));
    }

    #[test]
    fn json_output_reads_back() {
        let mut alarm = Alarm::new(
            Url::parse("https://www.heise.de").expect("url"),
            NaiveTime::from_hms_opt(8, 45, 0).expect("time"),
            Period::Weekend,
            Duration::minutes(15),
        );
        alarm.set_volume(70);
        alarm.set_enabled(false);

        let restored = Alarm::from_json(&alarm.to_json(), default_timeout()).expect("readable");
        assert_eq!(restored, alarm);
    }

    #[test]
    fn setters_report_changes_and_drop_seconds() {
        let mut alarm = Alarm::new(
            Url::parse("https://www.heise.de").expect("url"),
            NaiveTime::from_hms_opt(8, 45, 33).expect("time"),
            Period::Daily,
            default_timeout(),
        );
        assert_eq!(alarm.time(), NaiveTime::from_hms_opt(8, 45, 0).expect("time"));
        assert!(!alarm.set_period(Period::Daily));
        assert!(alarm.set_period(Period::Once));
        assert!(alarm.set_enabled(false));
        assert!(!alarm.set_enabled(false));
        assert!(alarm.set_volume(255));
        assert_eq!(alarm.volume(), MAX_VOLUME);

        assert!(alarm.set_time(NaiveTime::from_hms_opt(6, 0, 59).expect("time")));
        assert!(!alarm.set_time(NaiveTime::from_hms_opt(6, 0, 0).expect("time")));
        assert_eq!(alarm.time(), NaiveTime::from_hms_opt(6, 0, 0).expect("time"));
        let stream = Url::parse("http://st01.dlf.de/dlf/01/128/mp3/stream.mp3").expect("url");
        assert!(alarm.set_media(stream.clone()));
        assert!(!alarm.set_media(stream));
        assert!(alarm.set_timeout(Duration::minutes(45)));
        assert_eq!(alarm.timeout(), Duration::minutes(45));
    }

    #[test]
    fn rejects_out_of_range_timeout() {
        let value = json!({
            "id": "0b1e5c2a-4d3e-4f60-8a7b-9c0d1e2f3a4b",
            "period": "daily",
            "time": "07:15",
            "url": "https://www.heise.de",
            "alarmTimeout": i64::MAX
        });
        let err = Alarm::from_json(&value, default_timeout()).expect_err("too large");
        assert_eq!(err, AlarmParseError::InvalidTimeout(i64::MAX));
    }
}
