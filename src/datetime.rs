//! ISO-8601 text forms for dates, times, and date-times.
//!
//! The wire format has no native date-time type, so these values travel as
//! text. The rules here match RFC 3339 where the two overlap, including
//! rounding historical sub-minute UTC offsets to the nearest minute.

use std::fmt::Write;

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::error::EncodeError;
use crate::opt::Opt;
use crate::value::{DateTime, Time};

fn write_date_part(buf: &mut String, year: i32, month: u32, day: u32) {
    let _ = write!(buf, "{:04}-{:02}-{:02}", year, month, day);
}

fn write_time_part(buf: &mut String, time: impl Timelike, opts: Opt) {
    let _ = write!(
        buf,
        "{:02}:{:02}:{:02}",
        time.hour(),
        time.minute(),
        time.second()
    );
    // Sub-microsecond precision (and the leap-second marker bit) truncates.
    let micro = time.nanosecond() % 1_000_000_000 / 1_000;
    if micro != 0 && !opts.contains(Opt::OMIT_MICROSECONDS) {
        let _ = write!(buf, ".{:06}", micro);
    }
}

/// Append a UTC-offset suffix, rounding the offset to the nearest minute.
fn write_offset(buf: &mut String, offset_secs: i32, opts: Opt) {
    let minutes = (offset_secs.unsigned_abs() + 30) / 60;
    if minutes == 0 && opts.contains(Opt::UTC_Z) {
        buf.push('Z');
        return;
    }
    let sign = if offset_secs < 0 && minutes > 0 { '-' } else { '+' };
    let _ = write!(buf, "{}{:02}:{:02}", sign, minutes / 60, minutes % 60);
}

/// The text form of a date: `YYYY-MM-DD`, no time, no offset.
pub(crate) fn format_date(date: chrono::NaiveDate) -> String {
    let mut buf = String::with_capacity(10);
    write_date_part(&mut buf, date.year(), date.month(), date.day());
    buf
}

/// The text form of a wall-clock time. Offset-carrying times have no wire
/// form at all.
pub(crate) fn format_time(time: &Time, opts: Opt) -> Result<String, EncodeError> {
    if time.offset().is_some() {
        return Err(EncodeError::AwareTime);
    }
    let mut buf = String::with_capacity(15);
    write_time_part(&mut buf, time.time(), opts);
    Ok(buf)
}

/// The text form of a naive date-time, with the suffix `NAIVE_UTC`/`UTC_Z`
/// call for.
pub(crate) fn format_naive_datetime(dt: NaiveDateTime, opts: Opt) -> String {
    let mut buf = String::with_capacity(32);
    write_date_part(&mut buf, dt.year(), dt.month(), dt.day());
    buf.push('T');
    write_time_part(&mut buf, dt.time(), opts);
    if opts.contains(Opt::NAIVE_UTC) {
        write_offset(&mut buf, 0, opts);
    }
    buf
}

/// The text form of any date-time value.
pub(crate) fn format_datetime(dt: &DateTime, opts: Opt) -> String {
    match *dt {
        DateTime::Naive(naive) => format_naive_datetime(naive, opts),
        DateTime::Aware(aware) => {
            let mut buf = String::with_capacity(32);
            let local = aware.naive_local();
            write_date_part(&mut buf, local.year(), local.month(), local.day());
            buf.push('T');
            write_time_part(&mut buf, local.time(), opts);
            write_offset(&mut buf, aware.offset().local_minus_utc(), opts);
            buf
        }
    }
}
