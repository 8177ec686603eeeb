//! Lenient date parsing for spreadsheet and legacy registry values

use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Day-first formats come before ISO ones; the separators make them
/// mutually exclusive so the order never changes a result.
const DATE_FORMATS: &[&str] = &["%d-%m-%Y", "%d/%m/%Y", "%Y-%m-%d", "%Y/%m/%d"];

/// Two-digit years (`05-03-24`) parse as year 24; treat them as unknown.
const MIN_YEAR: i32 = 1000;

/// Time-of-day suffixes accepted after any of the date formats
const TIME_FORMATS: &[&str] = &[" %H:%M:%S", "T%H:%M:%S", " %H:%M", "T%H:%M"];

/// Convert a date string to ISO form.
///
/// `05/03/2024` becomes `2024-03-05`; a value with a time of day becomes
/// `2024-03-05T10:30:00`. Returns `None` for empty or unparseable input so
/// callers can record the date as unknown instead of failing.
pub fn parse_date_to_iso(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            if date.year() < MIN_YEAR {
                return None;
            }
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }

    for date_fmt in DATE_FORMATS {
        for time_fmt in TIME_FORMATS {
            let fmt = format!("{}{}", date_fmt, time_fmt);
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, &fmt) {
                if dt.year() < MIN_YEAR {
                    return None;
                }
                return Some(dt.format("%Y-%m-%dT%H:%M:%S").to_string());
            }
        }
    }

    None
}
