//! # Temporal Types
//!
//! ISO 8601 parsing for the three temporal validator kinds. Each type knows
//! how to normalize itself to a magnitude so range and equality constraints
//! compare meaning, not text:
//!
//! - [`IsoDate`] — calendar date `YYYY-MM-DD`, optionally with an extended
//!   signed year (`+YYYYYY-MM-DD`). Normalizes to midnight UTC.
//! - [`IsoDateTime`] — date, `T`, `HH:MM[:SS[.fff]]` and a designator (`Z`,
//!   `±HH`, `±HHMM` or `±HH:MM`). Normalizes to a UTC instant in milliseconds.
//! - [`IsoTimeZone`] — `Z` or `±HH:MM` only. Normalizes to an offset in
//!   minutes, so `Z`, `+00:00` and `-00:00` are equal.

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveTime};

use crate::error::TemporalError;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// A validated ISO 8601 calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IsoDate(NaiveDate);

impl IsoDate {
    /// Parse `YYYY-MM-DD`, `±YYYY-MM-DD` or `±YYYYYY-MM-DD`.
    ///
    /// # Errors
    ///
    /// Returns [`TemporalError::Malformed`] for the wrong shape and
    /// [`TemporalError::OutOfRange`] for a day that does not exist.
    pub fn parse(text: &str) -> Result<Self, TemporalError> {
        let malformed = || TemporalError::Malformed {
            value: text.to_string(),
            expected: "date",
        };

        let (sign, unsigned) = match text.as_bytes().first() {
            Some(b'+') => (1, &text[1..]),
            Some(b'-') => (-1, &text[1..]),
            _ => (1, text),
        };
        let signed = unsigned.len() != text.len();

        let mut parts = unsigned.split('-');
        let (year, month, day) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(y), Some(m), Some(d), None) => (y, m, d),
            _ => return Err(malformed()),
        };

        let year_digits = year.len();
        if !(year_digits == 4 || (signed && year_digits == 6)) {
            return Err(malformed());
        }
        let year = parse_digits(year, year_digits).ok_or_else(malformed)?;
        let month = parse_digits(month, 2).ok_or_else(malformed)?;
        let day = parse_digits(day, 2).ok_or_else(malformed)?;

        let year = i32::try_from(year).map_err(|_| malformed())? * sign;
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| TemporalError::OutOfRange {
                value: text.to_string(),
                reason: "no such calendar day".to_string(),
            })
    }

    /// Milliseconds since the Unix epoch at midnight UTC on this date.
    pub fn instant_millis(&self) -> i64 {
        self.0.and_time(NaiveTime::default()).and_utc().timestamp_millis()
    }

    /// The underlying chrono date.
    pub fn as_naive(&self) -> &NaiveDate {
        &self.0
    }
}

impl fmt::Display for IsoDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// A validated ISO 8601 date/time with an explicit UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct IsoDateTime {
    instant_millis: i64,
    offset_minutes: i32,
}

impl IsoDateTime {
    /// Parse `<date>T<time><designator>`.
    ///
    /// # Errors
    ///
    /// Returns [`TemporalError::Malformed`] for the wrong shape and
    /// [`TemporalError::OutOfRange`] for a date or time that does not exist.
    pub fn parse(text: &str) -> Result<Self, TemporalError> {
        let malformed = || TemporalError::Malformed {
            value: text.to_string(),
            expected: "date/time",
        };

        let (date_part, rest) = text.split_once('T').ok_or_else(malformed)?;
        let date = IsoDate::parse(date_part).map_err(|e| match e {
            TemporalError::Malformed { .. } => malformed(),
            TemporalError::OutOfRange { reason, .. } => TemporalError::OutOfRange {
                value: text.to_string(),
                reason,
            },
        })?;

        let zone_start = rest
            .find(|c: char| matches!(c, 'Z' | 'z' | '+' | '-'))
            .ok_or_else(malformed)?;
        let (time_part, zone_part) = rest.split_at(zone_start);

        let time = parse_time(time_part).ok_or_else(malformed)?;
        let offset_minutes = parse_designator(zone_part).ok_or_else(malformed)?;

        let local_millis = date.0.and_time(time).and_utc().timestamp_millis();
        Ok(Self {
            instant_millis: local_millis - i64::from(offset_minutes) * MILLIS_PER_MINUTE,
            offset_minutes,
        })
    }

    /// Milliseconds since the Unix epoch, in UTC.
    pub fn instant_millis(&self) -> i64 {
        self.instant_millis
    }

    /// The offset from UTC the value was written in.
    pub fn offset_minutes(&self) -> i32 {
        self.offset_minutes
    }
}

impl PartialEq for IsoDateTime {
    fn eq(&self, other: &Self) -> bool {
        self.instant_millis == other.instant_millis
    }
}

impl Eq for IsoDateTime {}

impl PartialOrd for IsoDateTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IsoDateTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant_millis.cmp(&other.instant_millis)
    }
}

/// A validated ISO 8601 time zone designator (`Z` or `±HH:MM`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IsoTimeZone {
    offset_minutes: i32,
}

impl IsoTimeZone {
    /// The UTC time zone.
    pub const UTC: Self = Self { offset_minutes: 0 };

    /// Parse `Z` or `±HH:MM` with hours 00-23 and minutes 00-59.
    ///
    /// # Errors
    ///
    /// Returns [`TemporalError::Malformed`] for anything else.
    pub fn parse(text: &str) -> Result<Self, TemporalError> {
        if text == "Z" {
            return Ok(Self::UTC);
        }

        let malformed = || TemporalError::Malformed {
            value: text.to_string(),
            expected: "time zone",
        };

        let sign = match text.as_bytes().first() {
            Some(b'+') => 1,
            Some(b'-') => -1,
            _ => return Err(malformed()),
        };
        let (hours, minutes) = text[1..].split_once(':').ok_or_else(malformed)?;
        let hours = parse_digits(hours, 2).filter(|h| *h < 24).ok_or_else(malformed)?;
        let minutes = parse_digits(minutes, 2).filter(|m| *m < 60).ok_or_else(malformed)?;

        // Bounded by 23 * 60 + 59 above.
        let magnitude = (hours * 60 + minutes) as i32;
        Ok(Self {
            offset_minutes: sign * magnitude,
        })
    }

    /// Offset from UTC in minutes; `-00:00` normalizes to zero.
    pub fn offset_minutes(&self) -> i32 {
        self.offset_minutes
    }
}

impl fmt::Display for IsoTimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.offset_minutes == 0 {
            return write!(f, "Z");
        }
        let sign = if self.offset_minutes < 0 { '-' } else { '+' };
        let magnitude = self.offset_minutes.unsigned_abs();
        write!(f, "{sign}{:02}:{:02}", magnitude / 60, magnitude % 60)
    }
}

/// Parse exactly `len` ASCII digits.
fn parse_digits(text: &str, len: usize) -> Option<u32> {
    if text.len() != len || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// `HH:MM`, `HH:MM:SS` or `HH:MM:SS.f{1,3}`.
fn parse_time(text: &str) -> Option<NaiveTime> {
    let (clock, fraction) = match text.split_once('.') {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (text, None),
    };

    let mut fields = clock.split(':');
    let hour = parse_digits(fields.next()?, 2)?;
    let minute = parse_digits(fields.next()?, 2)?;
    let second = match fields.next() {
        Some(s) => parse_digits(s, 2)?,
        None if fraction.is_none() => 0,
        None => return None,
    };
    if fields.next().is_some() {
        return None;
    }

    let millis = match fraction {
        None => 0,
        Some(f) if (1..=3).contains(&f.len()) => {
            let digits = parse_digits(f, f.len())?;
            digits * 10u32.pow(3 - f.len() as u32)
        }
        Some(_) => return None,
    };

    NaiveTime::from_hms_milli_opt(hour, minute, second, millis)
}

/// `Z`, `±HH`, `±HHMM` or `±HH:MM`, as minutes east of UTC.
fn parse_designator(text: &str) -> Option<i32> {
    if text == "Z" || text == "z" {
        return Some(0);
    }

    let sign = match text.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let body = &text[1..];
    if !body.bytes().all(|b| b.is_ascii_digit() || b == b':') {
        return None;
    }
    let (hours, minutes) = match body.len() {
        2 => (body, "00"),
        4 => (body.get(..2)?, body.get(2..)?),
        5 if body.as_bytes()[2] == b':' => (body.get(..2)?, body.get(3..)?),
        _ => return None,
    };
    let hours = parse_digits(hours, 2).filter(|h| *h < 24)?;
    let minutes = parse_digits(minutes, 2).filter(|m| *m < 60)?;
    Some(sign * (hours * 60 + minutes) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_accepts_calendar_days() {
        assert!(IsoDate::parse("2016-02-29").is_ok());
        assert!(IsoDate::parse("+002016-07-19").is_ok());
        assert!(IsoDate::parse("-0044-03-15").is_ok());
    }

    #[test]
    fn date_rejects_bad_shapes_and_days() {
        assert!(matches!(
            IsoDate::parse("2016-00-30"),
            Err(TemporalError::Malformed { .. }) | Err(TemporalError::OutOfRange { .. })
        ));
        assert!(matches!(
            IsoDate::parse("2015-02-29"),
            Err(TemporalError::OutOfRange { .. })
        ));
        assert!(IsoDate::parse("201-07-14").is_err());
        assert!(IsoDate::parse("002016-07-14").is_err());
        assert!(IsoDate::parse("2016-7-14").is_err());
        assert!(IsoDate::parse("2016-07-14T00:00Z").is_err());
    }

    #[test]
    fn date_orders_by_day() {
        let a = IsoDate::parse("2016-07-18").unwrap();
        let b = IsoDate::parse("2016-07-19").unwrap();
        assert!(a < b);
        assert_eq!(b.instant_millis() - a.instant_millis(), 86_400_000);
    }

    #[test]
    fn datetime_normalizes_offsets() {
        let local = IsoDateTime::parse("2016-07-19T19:24:38.920-0700").unwrap();
        let utc = IsoDateTime::parse("2016-07-20T02:24:38.920Z").unwrap();
        assert_eq!(local, utc);
        assert_eq!(local.offset_minutes(), -420);
    }

    #[test]
    fn datetime_millisecond_precision() {
        let a = IsoDateTime::parse("2016-07-19T19:24:38.919-07:00").unwrap();
        let b = IsoDateTime::parse("2016-07-19T19:24:38.920-07:00").unwrap();
        assert!(a < b);
        let short = IsoDateTime::parse("2016-07-19T19:24:38.9Z").unwrap();
        let long = IsoDateTime::parse("2016-07-19T19:24:38.900Z").unwrap();
        assert_eq!(short, long);
    }

    #[test]
    fn datetime_rejects_invalid_values() {
        for bad in [
            "2016-13-29T17:13:43.666Z",
            "2016-02-29T25:13:43.666Z",
            "201-07-14T21:21:21.212-08:00",
            "2016-02-29T17:13:43.6666Z",
            "2016-02-29T17:13:43",
            "2016-02-29",
            "2016-02-29T17Z",
            "2016-02-29T17:13:43+24:00",
            "2016-01-01T00:00+aé0",
            "2016-01-01T00:00+1é",
        ] {
            assert!(IsoDateTime::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn datetime_accepts_designator_forms() {
        for good in [
            "2016-02-29T17:13Z",
            "2016-02-29T17:13:43z",
            "2016-02-29T17:13:43+05",
            "2016-02-29T17:13:43+0530",
            "2016-02-29T17:13:43.1-05:30",
        ] {
            assert!(IsoDateTime::parse(good).is_ok(), "{good} should be accepted");
        }
    }

    #[test]
    fn timezone_formats() {
        assert_eq!(IsoTimeZone::parse("Z").unwrap(), IsoTimeZone::UTC);
        assert_eq!(IsoTimeZone::parse("-08:00").unwrap().offset_minutes(), -480);
        for bad in ["+1030", "10:30", "-08", "-24:00", "+24:00", "+12:60", "z", ""] {
            assert!(IsoTimeZone::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn timezone_zero_forms_are_equal() {
        let zulu = IsoTimeZone::parse("Z").unwrap();
        let plus = IsoTimeZone::parse("+00:00").unwrap();
        let minus = IsoTimeZone::parse("-00:00").unwrap();
        assert_eq!(zulu, plus);
        assert_eq!(plus, minus);
        assert!(IsoTimeZone::parse("-00:01").unwrap() < zulu);
    }

    #[test]
    fn timezone_display_round_trips_offset() {
        assert_eq!(IsoTimeZone::parse("-11:31").unwrap().to_string(), "-11:31");
        assert_eq!(IsoTimeZone::parse("+00:00").unwrap().to_string(), "Z");
    }
}
