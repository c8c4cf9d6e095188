// SPDX-License-Identifier: MIT

//! The calendar emulator: a pure function from a cron-style spec and a
//! reference time to the next absolute firing time, per spec.md §4.7.

use chrono::{DateTime, Datelike, Duration, Local, TimeZone, Timelike};

/// A five-field cron-style specification. `None` means wildcard. Ranges
/// match spec.md §4.7: month 0-11, day-of-month 1-31, weekday 0-6 (7 maps
/// to 0 by convention at the manifest layer, not here), hour 0-23, minute
/// 0-59.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarSpec {
    pub month: Option<u32>,
    pub day_of_month: Option<u32>,
    pub weekday: Option<u32>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
}

impl CalendarSpec {
    fn matches_month(&self, dt: &DateTime<Local>) -> bool {
        self.month.map_or(true, |m| dt.month0() == m)
    }
    fn matches_day(&self, dt: &DateTime<Local>) -> bool {
        self.day_of_month.map_or(true, |d| dt.day() == d)
    }
    fn matches_hour(&self, dt: &DateTime<Local>) -> bool {
        self.hour.map_or(true, |h| dt.hour() == h)
    }
    fn matches_minute(&self, dt: &DateTime<Local>) -> bool {
        self.minute.map_or(true, |m| dt.minute() == m)
    }
    fn matches_weekday(&self, dt: &DateTime<Local>) -> bool {
        self.weekday
            .map_or(true, |w| dt.weekday().num_days_from_sunday() == w)
    }
}

/// Returns the next time at or after `reference + 1 minute` that satisfies
/// every non-wildcard field of `spec`.
///
/// When both `day_of_month` and `weekday` are specified, the two
/// constraints are evaluated independently (day-of-month search, weekday
/// search) and the earlier candidate wins, per spec.md §4.7.
pub fn next_fire(spec: &CalendarSpec, reference: DateTime<Local>) -> DateTime<Local> {
    let start = truncate_to_minute(reference) + Duration::minutes(1);

    let day_candidate = search_day_of_month(spec, start);
    if spec.weekday.is_none() {
        return day_candidate;
    }

    let weekday_candidate = search_weekday(spec, start);
    if spec.day_of_month.is_none() {
        return weekday_candidate;
    }

    day_candidate.min(weekday_candidate)
}

fn truncate_to_minute(dt: DateTime<Local>) -> DateTime<Local> {
    dt - Duration::seconds(dt.second() as i64) - Duration::nanoseconds(dt.nanosecond() as i64)
}

/// Field-by-field descent over month -> day-of-month -> hour -> minute,
/// ignoring the weekday field entirely (the caller folds that in).
fn search_day_of_month(spec: &CalendarSpec, mut t: DateTime<Local>) -> DateTime<Local> {
    // Bounded: at most a little over a year of minutes before giving up
    // the month can only roll over once per spec.md's guarantee, but we
    // scan defensively rather than trust that invariant blindly.
    for _ in 0..(366 * 24 * 60) {
        if !spec.matches_month(&t) {
            t = advance_to_next_month(t);
            continue;
        }
        if !spec.matches_day(&t) {
            t = advance_to_next_day(t);
            continue;
        }
        if !spec.matches_hour(&t) {
            t = advance_to_next_hour(t);
            continue;
        }
        if !spec.matches_minute(&t) {
            t = t + Duration::minutes(1);
            continue;
        }
        return t;
    }
    t
}

/// Same descent, but day-of-month is unconstrained and a weekday match is
/// required instead.
fn search_weekday(spec: &CalendarSpec, mut t: DateTime<Local>) -> DateTime<Local> {
    for _ in 0..(366 * 24 * 60) {
        if !spec.matches_month(&t) {
            t = advance_to_next_month(t);
            continue;
        }
        if !spec.matches_weekday(&t) {
            t = advance_to_next_day(t);
            continue;
        }
        if !spec.matches_hour(&t) {
            t = advance_to_next_hour(t);
            continue;
        }
        if !spec.matches_minute(&t) {
            t = t + Duration::minutes(1);
            continue;
        }
        return t;
    }
    t
}

fn advance_to_next_month(t: DateTime<Local>) -> DateTime<Local> {
    let (year, month) = if t.month() == 12 {
        (t.year() + 1, 1)
    } else {
        (t.year(), t.month() + 1)
    };
    Local
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(t)
}

fn advance_to_next_day(t: DateTime<Local>) -> DateTime<Local> {
    let next = t.date_naive().succ_opt().unwrap_or(t.date_naive());
    Local
        .with_ymd_and_hms(next.year(), next.month(), next.day(), 0, 0, 0)
        .single()
        .unwrap_or(t)
}

fn advance_to_next_hour(t: DateTime<Local>) -> DateTime<Local> {
    let truncated = t - Duration::minutes(t.minute() as i64);
    truncated + Duration::hours(1)
}

#[cfg(test)]
#[path = "calendar_tests.rs"]
mod tests;
