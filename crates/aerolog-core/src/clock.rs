//! Monotonic and wall-clock time primitives
//!
//! Two notions of time coexist on the device:
//! - a free-running millisecond counter since boot, used only for scheduling,
//!   which wraps at `u32::MAX`;
//! - a civil wall clock used for timestamps, which may be unset, on the
//!   fallback value, or network-synchronized.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Milliseconds since boot. Wraps after roughly 49.7 days.
pub type Millis = u32;

/// Source of the monotonic millisecond counter.
pub trait MonotonicClock {
    /// Current counter value. Must never go backwards except by wrapping.
    fn now_ms(&self) -> Millis;
}

/// Returns `true` once at least `period` ms have elapsed since `last_run`.
///
/// The subtraction wraps, so a counter that rolled over between `last_run`
/// and `now` still yields the right answer.
#[inline]
pub const fn is_due(now: Millis, last_run: Millis, period: Millis) -> bool {
    now.wrapping_sub(last_run) >= period
}

const SECS_PER_DAY: i64 = 86_400;

/// Civil date and time, second resolution, no zone information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateTime {
    pub year: u16,
    /// 1..=12
    pub month: u8,
    /// 1..=31
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DateTime {
    pub const fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Whether every field is inside its calendar range.
    pub fn is_valid(&self) -> bool {
        (1..=12).contains(&self.month)
            && self.day >= 1
            && self.day <= days_in_month(self.year, self.month)
            && self.hour < 24
            && self.minute < 60
            && self.second < 60
    }

    /// Seconds since 1970-01-01 00:00:00.
    pub fn to_unix_secs(&self) -> i64 {
        let days = days_from_civil(self.year as i64, self.month as i64, self.day as i64);
        days * SECS_PER_DAY
            + self.hour as i64 * 3600
            + self.minute as i64 * 60
            + self.second as i64
    }

    /// Inverse of [`DateTime::to_unix_secs`]. Years outside `0..=65535` saturate.
    pub fn from_unix_secs(secs: i64) -> Self {
        let days = secs.div_euclid(SECS_PER_DAY);
        let rem = secs.rem_euclid(SECS_PER_DAY);
        let (year, month, day) = civil_from_days(days);

        Self {
            year: year.clamp(0, u16::MAX as i64) as u16,
            month: month as u8,
            day: day as u8,
            hour: (rem / 3600) as u8,
            minute: ((rem % 3600) / 60) as u8,
            second: (rem % 60) as u8,
        }
    }

    /// This instant shifted by `secs` seconds.
    pub fn plus_secs(&self, secs: i64) -> Self {
        Self::from_unix_secs(self.to_unix_secs() + secs)
    }
}

/// Spreadsheet-friendly `DD.MM.YYYY HH:MM:SS`.
impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}.{:02}.{:04} {:02}:{:02}:{:02}",
            self.day, self.month, self.year, self.hour, self.minute, self.second
        )
    }
}

const fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

const fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

// Howard Hinnant's days_from_civil / civil_from_days.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

/// The board's real-time clock.
pub trait WallClock {
    /// Current wall-clock time, or `None` when the clock is unset or unreadable.
    fn now(&self) -> Option<DateTime>;

    /// Overwrite the wall clock.
    fn set(&mut self, time: DateTime);
}

/// `embedded_sdmmc::TimeSource` backed by a wall clock, so FAT directory
/// entries carry the station's own time.
///
/// Boards usually hand this a cheap clone of their RTC handle.
pub struct FileTimestamps<C>(pub C);

impl<C: WallClock> embedded_sdmmc::TimeSource for FileTimestamps<C> {
    fn get_timestamp(&self) -> embedded_sdmmc::Timestamp {
        // FAT cannot represent anything before 1970, so an unset clock maps to the epoch.
        let now = self
            .0
            .now()
            .filter(|t| t.is_valid() && t.year >= 1970)
            .unwrap_or(DateTime::new(1970, 1, 1, 0, 0, 0));

        embedded_sdmmc::Timestamp {
            year_since_1970: (now.year - 1970).min(u8::MAX as u16) as u8,
            zero_indexed_month: now.month - 1,
            zero_indexed_day: now.day - 1,
            hours: now.hour,
            minutes: now.minute,
            seconds: now.second,
        }
    }
}
