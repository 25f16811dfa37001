use anyhow::Result;

use crate::alarm::scheduler::{TimeDisplayMode, find_upcoming, format_upcoming, get_next_instance};
use crate::clock::SelectedClock;
use crate::config::ConfigStore;
use crate::store::{AlarmStore, TimeoutStore};

pub fn run_diagnostics(
    selected: &SelectedClock,
    store: &ConfigStore,
    display_mode: TimeDisplayMode,
) -> Result<()> {
    let now = selected.clock.now();
    let alarms = store.list();

    println!("roosterd configuration check");
    println!("Clock source: {}", selected.label);
    println!("Now: {}", now.format("%a %Y-%m-%d %H:%M:%S"));
    println!(
        "Alarm timeout: {} min",
        store.get_alarm_timeout().num_minutes()
    );
    println!(
        "Sleep timeout: {} min",
        store.get_sleep_timeout().num_minutes()
    );
    println!("Alarms: {}", alarms.len());
    for alarm in &alarms {
        let next = get_next_instance(alarm, &now)
            .map(|instant| format_upcoming(Some(instant), display_mode))
            .unwrap_or_else(|| "disabled".to_string());
        println!(
            "  {} {} {:<8} vol {:>3} {} min -> {} ({})",
            alarm.id(),
            alarm.time().format("%H:%M"),
            alarm.period().as_token(),
            alarm.volume(),
            alarm.timeout().num_minutes(),
            next,
            alarm.media()
        );
    }

    let upcoming = find_upcoming(&alarms, &now).map(|(_, instant)| instant);
    println!(
        "Upcoming alarm: {}",
        format_upcoming(upcoming, display_mode)
    );
    Ok(())
}
