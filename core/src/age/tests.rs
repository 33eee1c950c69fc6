use super::*;
use proptest::prelude::*;

#[test]
fn day_and_subday_combine() {
    let ago = parse_ago("1d1h3m").unwrap();
    assert_eq!(ago.duration, -(ChronoDuration::hours(25) + ChronoDuration::minutes(3)));
    assert!(!ago.capped);
}

#[test]
fn day_only() {
    let ago = parse_ago("3d").unwrap();
    assert_eq!(ago.duration, -ChronoDuration::hours(72));
}

#[test]
fn minutes_only() {
    let ago = parse_ago("15m").unwrap();
    assert_eq!(ago.duration, -ChronoDuration::seconds(15 * 60));
}

#[test]
fn empty_string_is_eof_error() {
    let err = parse_ago("").unwrap_err();
    assert!(matches!(err, PurgeError::InvalidAgo(_, _)));
}

#[test]
fn unknown_unit_errors() {
    let err = parse_ago("15p").unwrap_err();
    assert!(matches!(err, PurgeError::InvalidAgo(_, _)));
}

#[test]
fn overrun_caps_at_150_years_and_warns() {
    let ago = parse_ago("999999d").unwrap();
    assert_eq!(ago.duration, -ChronoDuration::days(150 * 365));
    assert!(ago.capped);
}

#[test]
fn sub_day_cap_applies_independently() {
    // 999999h is far beyond 150 years in hours too.
    let ago = parse_ago("999999h").unwrap();
    assert_eq!(ago.duration, -ChronoDuration::days(150 * 365));
    assert!(ago.capped);
}

#[test]
fn seconds_unit() {
    let ago = parse_ago("90s").unwrap();
    assert_eq!(ago.duration, -ChronoDuration::seconds(90));
}

#[test]
fn milliseconds_unit_disambiguated_from_minutes() {
    let ago = parse_ago("500ms").unwrap();
    assert_eq!(ago.duration, -ChronoDuration::milliseconds(500));
}

#[test]
fn bare_day_digit_without_d_suffix_is_not_a_day_prefix() {
    // "5h" has no trailing 'd', so the whole string is a duration suffix.
    let ago = parse_ago("5h").unwrap();
    assert_eq!(ago.duration, -ChronoDuration::hours(5));
}

proptest! {
    /// For any day count and h/m/s triple below the 150-year cap,
    /// `parse_ago("{days}d{h}h{m}m{s}s")` reconstructs the exact negated sum
    /// of its components uncapped, per spec.md §8's age round-trip property.
    #[test]
    fn day_and_subday_components_sum_exactly(
        days in 0i64..500,
        hours in 0i64..24,
        minutes in 0i64..60,
        seconds in 0i64..60,
    ) {
        let input = format!("{days}d{hours}h{minutes}m{seconds}s");
        let ago = parse_ago(&input).unwrap();

        let expected = -(ChronoDuration::days(days)
            + ChronoDuration::hours(hours)
            + ChronoDuration::minutes(minutes)
            + ChronoDuration::seconds(seconds));

        prop_assert_eq!(ago.duration, expected);
        prop_assert!(!ago.capped);
    }

    /// Day counts at or beyond the cap always yield the capped duration and
    /// a `capped` flag, regardless of the exact overrun amount.
    #[test]
    fn day_counts_beyond_cap_always_cap(extra_days in 1i64..10_000) {
        let days = 150 * 365 + extra_days;
        let ago = parse_ago(&format!("{days}d")).unwrap();
        prop_assert_eq!(ago.duration, -ChronoDuration::days(150 * 365));
        prop_assert!(ago.capped);
    }
}
