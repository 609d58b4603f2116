use crate::models::MemberStatus;
use chrono::{Duration, Months, NaiveDate};

pub const EXPIRING_WINDOW_DAYS: i64 = 7;

/// Derives a member's status from the end of their current term.
///
/// `today` is passed in rather than read from the clock so the result
/// depends on nothing but its arguments.
pub fn evaluate(end_date: Option<NaiveDate>, today: NaiveDate) -> MemberStatus {
    let Some(end_date) = end_date else {
        return MemberStatus::Unknown;
    };
    if end_date < today {
        MemberStatus::Expired
    } else if end_date <= today + Duration::days(EXPIRING_WINDOW_DAYS) {
        MemberStatus::ExpiringSoon
    } else {
        MemberStatus::Active
    }
}

/// Calendar-month addition. The day of month is kept when the target
/// month has it and clamped to that month's last day otherwise, so
/// 31-Jan-2024 plus one month is 29-Feb-2024. `None` only when the
/// result leaves chrono's date range.
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}
