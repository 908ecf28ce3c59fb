use remindroom_core::{DueTime, ReminderDb};

use super::CmdResult;

pub fn run() -> CmdResult {
    let db = ReminderDb::open()?;
    let stats = db.stats(DueTime::truncate(super::now()))?;
    super::print_json(&stats)
}
