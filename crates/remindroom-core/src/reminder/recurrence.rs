//! Recurrence calculator.
//!
//! Month and year steps are fixed offsets of 30 and 365 days, not calendar
//! arithmetic. Reminders created on the 31st drift through shorter months and
//! leap days are ignored; stored due dates depend on this, so keep it.

use super::{DueTime, Recurrence};
use crate::error::RecordError;

const DAYS_PER_WEEK: i64 = 7;
const DAYS_PER_MONTH: i64 = 30;
const DAYS_PER_YEAR: i64 = 365;

/// Next due time after `due` for the given recurrence.
///
/// `Recurrence::None` returns `due` unchanged; callers must not re-arm a
/// reminder on that basis.
pub fn advance(due: DueTime, recurrence: Recurrence) -> DueTime {
    match recurrence {
        Recurrence::None => due,
        Recurrence::Daily => due.plus_days(1),
        Recurrence::Weekly => due.plus_days(DAYS_PER_WEEK),
        Recurrence::Monthly => due.plus_days(DAYS_PER_MONTH),
        Recurrence::Yearly => due.plus_days(DAYS_PER_YEAR),
    }
}

/// [`advance`] on an unparsed due time.
pub fn advance_raw(raw: &str, recurrence: Recurrence) -> Result<DueTime, RecordError> {
    Ok(advance(DueTime::parse(raw)?, recurrence))
}
