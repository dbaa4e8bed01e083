//! Log file line format
//!
//! One `;`-separated line per entry. Decimal fields use a comma as the
//! fractional separator so spreadsheet imports in comma-decimal locales read
//! them as numbers; the substitution is applied per numeric field after
//! formatting, so the timestamp keeps its dots.

use core::fmt::{self, Write};

use crate::clock::DateTime;
use crate::sensors::Climate;

/// Column names, written once at the top of an empty log file.
pub const HEADER: &str = "Date_Time;Temperature_C;Humidity_Pct;Pressure_hPa;Air_Quality_Raw";

pub const FIELD_SEPARATOR: char = ';';

/// Terminator for the header and every record.
pub const LINE_ENDING: &str = "\r\n";

pub const MAX_LINE_LEN: usize = 96;

pub type RecordLine = heapless::String<MAX_LINE_LEN>;

/// One log entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogRecord {
    /// `None` when the wall clock could not be read; the field is left empty.
    pub timestamp: Option<DateTime>,
    pub climate: Climate,
    pub air_quality: i32,
}

impl LogRecord {
    /// Render as `DD.MM.YYYY HH:MM:SS;23,45;41,20;1013,25;182`.
    pub fn to_line(&self) -> Result<RecordLine, fmt::Error> {
        let mut line = RecordLine::new();

        if let Some(ts) = self.timestamp {
            write!(line, "{}", ts)?;
        }
        line.write_char(FIELD_SEPARATOR)?;
        push_decimal(&mut line, self.climate.temperature_c)?;
        line.write_char(FIELD_SEPARATOR)?;
        push_decimal(&mut line, self.climate.humidity_pct)?;
        line.write_char(FIELD_SEPARATOR)?;
        push_decimal(&mut line, self.climate.pressure_hpa)?;
        line.write_char(FIELD_SEPARATOR)?;
        write!(line, "{}", self.air_quality)?;

        Ok(line)
    }
}

/// Two decimals, `.` swapped for `,`.
fn push_decimal<W: Write>(out: &mut W, value: f32) -> fmt::Result {
    let mut field = heapless::String::<24>::new();
    write!(field, "{:.2}", value)?;
    for ch in field.chars() {
        out.write_char(if ch == '.' { ',' } else { ch })?;
    }
    Ok(())
}
