//! Display time for a message.
//!
//! Servers send either a ready clock string or an instant. A string that
//! contains a colon is shown as-is; anything else is read as an instant and
//! rendered as zero-padded 24-hour `HH:MM` local time.

use std::fmt::Display;

use chrono::{Local, NaiveDate, TimeZone, Utc};
use tracing::debug;

use chatflow_shared::MessageTime;

pub fn format_time(time: &MessageTime) -> String {
    format_time_in(time, &Local)
}

pub fn format_time_in<Tz>(time: &MessageTime, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match time {
        MessageTime::Text(s) if s.contains(':') => s.clone(),
        MessageTime::Text(s) => match parse_instant(s) {
            Some(ms) => clock(ms, tz).unwrap_or_else(|| s.clone()),
            None => {
                debug!(time = %s, "Unparseable message time, showing raw value");
                s.clone()
            }
        },
        MessageTime::Millis(ms) => clock(*ms, tz).unwrap_or_else(|| ms.to_string()),
    }
}

/// Epoch millis from a numeric string or a bare `YYYY-MM-DD` date (UTC midnight).
fn parse_instant(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(ms) = s.parse::<i64>() {
        return Some(ms);
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight).timestamp_millis())
}

fn clock<Tz>(ms: i64, tz: &Tz) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let dt = tz.timestamp_millis_opt(ms).single()?;
    Some(dt.format("%H:%M").to_string())
}
