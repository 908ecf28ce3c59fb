pub mod config;
pub mod reminder;
pub mod sound;
pub mod stats;
pub mod watch;

use chrono::NaiveDateTime;
use serde::Serialize;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Local wall-clock time; due times carry no timezone.
pub fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
