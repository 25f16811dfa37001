use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use anyhow::{Context, Result, bail};
use chrono::Duration;
use clap::Parser;
use log::info;
use url::Url;

use roosterd::alarm::monitor::DEFAULT_FALLBACK_TIMEOUT_SECS;
use roosterd::alarm::scheduler::TimeDisplayMode;
use roosterd::app::{Runtime, RuntimeSettings};
use roosterd::clock::{parse_local_datetime, select_clock};
use roosterd::config::ConfigStore;
use roosterd::diagnostics;
use roosterd::events::EventQueue;
use roosterd::player_stub::LogPlayer;

#[derive(Parser, Debug)]
#[command(
    name = "roosterd",
    version,
    about = "Alarm clock daemon: schedules recurring alarms and supervises playback"
)]
struct Cli {
    #[arg(long, default_value = "roosterd.json")]
    config: PathBuf,

    /// Seconds the player has to start before the alarm counts as delivered
    #[arg(long, default_value_t = DEFAULT_FALLBACK_TIMEOUT_SECS)]
    fallback_timeout_secs: u32,

    #[arg(long, default_value = "file:///usr/share/roosterd/TempleBell.mp3")]
    fallback_media: String,

    #[arg(long, default_value_t = 250)]
    tick_ms: u64,

    /// Run against a simulated local clock starting at this time
    #[arg(long)]
    simulate_from: Option<String>,

    /// Print the loaded configuration and computed schedule, then exit
    #[arg(long)]
    check: bool,

    #[arg(long)]
    hour12: bool,

    #[arg(long)]
    exit_after_secs: Option<u64>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    if cli.fallback_timeout_secs == 0 {
        bail!("--fallback-timeout-secs must be greater than zero");
    }
    if cli.tick_ms == 0 {
        bail!("--tick-ms must be greater than zero");
    }
    let fallback_media = Url::parse(&cli.fallback_media)
        .with_context(|| format!("invalid --fallback-media {}", cli.fallback_media))?;
    let simulate_from = cli
        .simulate_from
        .as_deref()
        .map(parse_local_datetime)
        .transpose()
        .context("invalid --simulate-from, expected YYYY-MM-DDTHH:MM:SS")?;
    let display_mode = if cli.hour12 {
        TimeDisplayMode::Hour12
    } else {
        TimeDisplayMode::Hour24
    };

    let selected = select_clock(simulate_from);
    let queue = EventQueue::new();
    let store = ConfigStore::load(&cli.config)?.with_events(queue.sender());

    if cli.check {
        return diagnostics::run_diagnostics(&selected, &store, display_mode);
    }

    info!("clock source: {}", selected.label);
    let player = Box::new(LogPlayer::new(queue.sender()));
    let mut runtime = Runtime::new(
        queue,
        Arc::new(store),
        selected.clock,
        player,
        RuntimeSettings {
            fallback_timeout: Duration::seconds(i64::from(cli.fallback_timeout_secs)),
            fallback_media,
            display_mode,
        },
    );
    let deadline = cli
        .exit_after_secs
        .map(|secs| Instant::now() + StdDuration::from_secs(secs));
    runtime.run(StdDuration::from_millis(cli.tick_ms), deadline);
    Ok(())
}
