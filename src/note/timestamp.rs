//! Timestamp codec for persisted notes
//!
//! Timestamps are local wall-clock time with second precision, written as
//! `YYYY-MM-DDTHH-MM-SS`. Dashes replace the usual colons so the string is
//! also safe inside file names.

use chrono::{Local, NaiveDateTime, Timelike};

use crate::{Error, Result};

/// `strftime` pattern used for every persisted timestamp.
pub const FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// Current local time truncated to whole seconds.
#[must_use]
pub fn now() -> NaiveDateTime {
    truncate(Local::now().naive_local())
}

/// Drop any sub-second part.
#[must_use]
pub fn truncate(dt: NaiveDateTime) -> NaiveDateTime {
    dt.with_nanosecond(0).unwrap_or(dt)
}

/// Format a timestamp with [`FORMAT`].
#[must_use]
pub fn format(dt: &NaiveDateTime) -> String {
    dt.format(FORMAT).to_string()
}

/// Parse a timestamp written with [`FORMAT`].
///
/// # Errors
///
/// Returns [`Error::InvalidTimestamp`] for any other pattern.
pub fn parse(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, FORMAT)
        .map_err(|_| Error::InvalidTimestamp(s.to_string()))
}
