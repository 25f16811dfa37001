//! Alarm scheduling and dispatch core of a networked alarm clock.
//!
//! [`app::Runtime`] is the entry point for front ends: it owns the
//! dispatcher, the playback monitor and the sleep timer, and exposes the
//! alarm and timeout operations a GUI or REST layer calls into.

pub mod alarm;
pub mod app;
pub mod clock;
pub mod config;
pub mod countdown;
pub mod diagnostics;
pub mod events;
pub mod player;
pub mod player_stub;
pub mod sleep_timer;
pub mod store;
