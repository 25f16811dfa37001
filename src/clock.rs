use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Local, NaiveDateTime};

/// Source of local wall-clock time. Everything that needs "now" receives one
/// of these at construction.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Starts at an arbitrary local time and then advances with the monotonic clock.
pub struct SimulatedClock {
    wall_anchor: NaiveDateTime,
    monotonic_anchor: Instant,
}

impl SimulatedClock {
    pub fn starting_at(wall_anchor: NaiveDateTime) -> Self {
        Self {
            wall_anchor,
            monotonic_anchor: Instant::now(),
        }
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> NaiveDateTime {
        let elapsed = Duration::from_std(self.monotonic_anchor.elapsed()).unwrap_or(Duration::MAX);
        self.wall_anchor
            .checked_add_signed(elapsed)
            .unwrap_or(NaiveDateTime::MAX)
    }
}

pub struct SelectedClock {
    pub clock: Arc<dyn Clock>,
    pub label: &'static str,
}

pub fn select_clock(simulate_from: Option<NaiveDateTime>) -> SelectedClock {
    match simulate_from {
        Some(start) => SelectedClock {
            clock: Arc::new(SimulatedClock::starting_at(start)),
            label: "SIMULATED",
        },
        None => SelectedClock {
            clock: Arc::new(SystemClock),
            label: "SYSTEM_LOCAL",
        },
    }
}

pub fn parse_local_datetime(input: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let input = input.trim();
    NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M"))
}

#[cfg(test)]
pub use mock::MockClock;


#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn simulated_clock_starts_at_anchor_and_advances() {
        let start = parse_local_datetime("2020-11-18T08:46:20").expect("valid datetime");
        let clock = SimulatedClock::starting_at(start);
        let first = clock.now();
        thread::sleep(std::time::Duration::from_millis(5));
        let second = clock.now();

        assert!(first >= start);
        assert!(second > first);
        assert!(second - start < Duration::seconds(5));
    }

    #[test]
    fn parse_local_datetime_accepts_iso_and_space_variants() {
        let iso = parse_local_datetime("2020-11-22T09:00:00").expect("iso");
        let spaced = parse_local_datetime("2020-11-22 09:00:00").expect("spaced");
        let short = parse_local_datetime("2020-11-22T09:00").expect("short");
        assert_eq!(iso, spaced);
        assert_eq!(iso, short);
        assert!(parse_local_datetime("yesterday").is_err());
    }

    #[test]
    fn mock_clock_only_moves_when_told() {
        let start = parse_local_datetime("2020-11-20T09:00:00").expect("valid datetime");
        let clock = MockClock::at(start);
        assert_eq!(clock.now(), start);
        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now(), start + Duration::minutes(5));
        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn select_clock_labels_source() {
        assert_eq!(select_clock(None).label, "SYSTEM_LOCAL");
        let start = parse_local_datetime("2020-11-20T09:00:00").expect("valid datetime");
        let selected = select_clock(Some(start));
        assert_eq!(selected.label, "SIMULATED");
        assert!(selected.clock.now() >= start);
    }
}
