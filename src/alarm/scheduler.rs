use std::cmp::Ordering;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Weekday};

use crate::alarm::model::{Alarm, Period};

pub const NO_UPCOMING_ALARM: &str = "no upcoming alarm";

/// Next instant `alarm` fires at or after `now`, or `None` when disabled.
///
/// "Once" computes exactly like "Daily"; whether it disarms after firing is up
/// to the caller.
pub fn get_next_instance(alarm: &Alarm, now: &NaiveDateTime) -> Option<NaiveDateTime> {
    if !alarm.is_enabled() {
        return None;
    }

    let today = now.date();
    let time_passed = now.time() > alarm.time();
    let date = match alarm.period() {
        Period::Once | Period::Daily => {
            if time_passed {
                today.succ_opt()?
            } else {
                today
            }
        }
        Period::Weekend => {
            let mut date = today;
            if is_weekend(today.weekday()) && time_passed {
                date = date.succ_opt()?;
            }
            if !is_weekend(date.weekday()) {
                date = advance_to(date, Weekday::Sat)?;
            }
            date
        }
        Period::Workdays => {
            let mut date = today;
            if is_weekend(today.weekday()) {
                date = advance_to(date, Weekday::Mon)?;
            } else if time_passed {
                date = date.succ_opt()?;
            }
            if is_weekend(date.weekday()) {
                date = advance_to(date, Weekday::Mon)?;
            }
            date
        }
    };

    Some(date.and_time(alarm.time()))
}

/// Orders alarms by their next instance. A disabled alarm sorts after every
/// enabled one; two disabled alarms are equal.
pub fn cmp_next_instance(lhs: &Alarm, rhs: &Alarm, now: &NaiveDateTime) -> Ordering {
    match (get_next_instance(lhs, now), get_next_instance(rhs, now)) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn fires_before(lhs: &Alarm, rhs: &Alarm, now: &NaiveDateTime) -> bool {
    cmp_next_instance(lhs, rhs, now) == Ordering::Less
}

/// Soonest enabled alarm and its next instance. Never fails: an empty or
/// all-disabled list yields `None`.
pub fn find_upcoming<'a>(
    alarms: &'a [Alarm],
    now: &NaiveDateTime,
) -> Option<(&'a Alarm, NaiveDateTime)> {
    let soonest = alarms.iter().reduce(|best, candidate| {
        if fires_before(candidate, best, now) {
            candidate
        } else {
            best
        }
    })?;
    let instant = get_next_instance(soonest, now)?;
    Some((soonest, instant))
}

fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

fn advance_to(date: NaiveDate, target: Weekday) -> Option<NaiveDate> {
    let today = date.weekday().num_days_from_monday();
    let wanted = target.num_days_from_monday();
    let offset = (wanted + 7 - today) % 7;
    date.checked_add_days(Days::new(u64::from(offset)))
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TimeDisplayMode {
    Hour24,
    Hour12,
}

pub fn format_upcoming(next: Option<NaiveDateTime>, mode: TimeDisplayMode) -> String {
    match next {
        Some(dt) => match mode {
            TimeDisplayMode::Hour24 => dt.format("%a %H:%M").to_string(),
            TimeDisplayMode::Hour12 => dt.format("%a %I:%M %p").to_string(),
        },
        None => NO_UPCOMING_ALARM.to_string(),
    }
}
