//! Property tests for temporal normalization.
//!
//! Range and equality constraints on date, date/time and time zone values
//! rely on normalization being consistent: the same instant written with
//! different offsets must compare equal, and ordering must follow the
//! underlying magnitude rather than the text.

use docguard_core::{IsoDate, IsoDateTime, IsoTimeZone};
use proptest::prelude::*;

proptest! {
    #[test]
    fn datetime_offsets_describe_the_same_instant(
        hour in 0u32..24,
        minute in 0u32..60,
        offset_hours in 0i32..12,
    ) {
        let utc = IsoDateTime::parse(&format!("2020-06-15T{hour:02}:{minute:02}:00Z")).unwrap();

        // Shift the wall clock east by `offset_hours` and declare the offset.
        let total = hour as i32 * 60 + minute as i32 + offset_hours * 60;
        let day = 15 + total.div_euclid(24 * 60);
        let minutes_of_day = total.rem_euclid(24 * 60);
        let local = format!(
            "2020-06-{day:02}T{:02}:{:02}:00+{offset_hours:02}:00",
            minutes_of_day / 60,
            minutes_of_day % 60,
        );
        let shifted = IsoDateTime::parse(&local).unwrap();

        prop_assert_eq!(utc, shifted);
    }

    #[test]
    fn date_order_matches_day_order(a in 1u32..=28, b in 1u32..=28) {
        let da = IsoDate::parse(&format!("2019-02-{a:02}")).unwrap();
        let db = IsoDate::parse(&format!("2019-02-{b:02}")).unwrap();
        prop_assert_eq!(da.cmp(&db), a.cmp(&b));
        prop_assert_eq!(da.instant_millis().cmp(&db.instant_millis()), a.cmp(&b));
    }

    #[test]
    fn arbitrary_text_never_panics(text in "\\PC{0,24}") {
        let _ = IsoDate::parse(&text);
        let _ = IsoDateTime::parse(&text);
        let _ = IsoTimeZone::parse(&text);
        let _ = IsoDateTime::parse(&format!("2016-01-01T00:00{text}"));
        let _ = IsoDateTime::parse(&format!("2016-01-01T00:00+{text}"));
    }

    #[test]
    fn non_ascii_designators_are_malformed(
        zone in "[+-][0-9a-zé:]{1,5}",
    ) {
        let text = format!("2016-01-01T00:00{zone}");
        let ascii_digits = zone[1..].bytes().all(|b| b.is_ascii_digit() || b == b':');
        if !ascii_digits {
            prop_assert!(IsoDateTime::parse(&text).is_err());
        }
    }

    #[test]
    fn timezone_display_parses_back(sign in prop::bool::ANY, hours in 0u32..24, minutes in 0u32..60) {
        let text = format!("{}{hours:02}:{minutes:02}", if sign { '+' } else { '-' });
        let tz = IsoTimeZone::parse(&text).unwrap();
        let reparsed = IsoTimeZone::parse(&tz.to_string()).unwrap();
        prop_assert_eq!(tz, reparsed);
    }
}

#[test]
fn negative_zero_offset_is_utc() {
    assert_eq!(IsoTimeZone::parse("-00:00").unwrap(), IsoTimeZone::UTC);
}
