//! `ago` duration parsing: `[<days>d][<go-style duration>]`.
//!
//! Both the day prefix and the sub-day suffix are optional, but at least one
//! must be present. The parsed duration is negated on return (the tool
//! selects things *older than* the cutoff, so the duration moves the
//! comparison point into the past) and capped at 150 years to keep the
//! resulting timestamp arithmetic from overflowing.

use crate::error::{PurgeError, Result};
use chrono::Duration as ChronoDuration;

#[cfg(test)]
mod tests;

/// 150 years, expressed in days; the cap applied to both the day prefix and
/// the sub-day suffix independently before they're summed.
const MAX_DAYS: i64 = 150 * 365;

/// The negated (i.e. "how far into the past") duration produced by
/// [`parse_ago`], plus whether the cap was hit (callers surface a warning).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ago {
    pub duration: ChronoDuration,
    pub capped: bool,
}

/// Parses an `ago` string of the form `[<int>d][<duration>]`, where
/// `<duration>` is a Go-style suffix-sequence of `h`/`m`/`s` components
/// (e.g. `1h3m`, `90s`). Returns the *negative* duration (delete things
/// older than `now + duration`).
///
/// Examples: `"1d1h3m"` → `-(25h3m)`; `"3d"` → `-72h`; `""` → error.
pub fn parse_ago(input: &str) -> Result<Ago> {
    if input.is_empty() {
        return Err(PurgeError::InvalidAgo(
            input.to_string(),
            "unexpected end of input".to_string(),
        ));
    }

    let (day_count, rest) = split_day_prefix(input)?;
    if day_count.is_none() && rest.is_empty() {
        return Err(PurgeError::InvalidAgo(
            input.to_string(),
            "at least one of the day prefix or duration suffix must be present".to_string(),
        ));
    }

    let mut capped = false;

    let day_duration = match day_count {
        Some(days) => {
            let (days, day_capped) = cap_days(days);
            capped |= day_capped;
            ChronoDuration::days(days)
        }
        None => ChronoDuration::zero(),
    };

    let sub_day_duration = if rest.is_empty() {
        ChronoDuration::zero()
    } else {
        let parsed = parse_go_duration(rest)
            .map_err(|e| PurgeError::InvalidAgo(input.to_string(), e))?;
        let (days, secs_capped) = cap_duration(parsed);
        capped |= secs_capped;
        days
    };

    Ok(Ago {
        duration: -(day_duration + sub_day_duration),
        capped,
    })
}

/// Splits a leading `<digits>d` prefix off `input`, if present.
fn split_day_prefix(input: &str) -> Result<(Option<i64>, &str)> {
    let bytes = input.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    if idx == 0 {
        return Ok((None, input));
    }
    if bytes.get(idx) != Some(&b'd') {
        // Digits present but no 'd' suffix: not a day prefix, treat the
        // whole string as a duration suffix instead (e.g. "15m").
        return Ok((None, input));
    }
    let days: i64 = input[..idx]
        .parse()
        .map_err(|_| PurgeError::InvalidAgo(input.to_string(), "day count overflow".to_string()))?;
    Ok((Some(days), &input[idx + 1..]))
}

fn cap_days(days: i64) -> (i64, bool) {
    if days > MAX_DAYS {
        (MAX_DAYS, true)
    } else {
        (days, false)
    }
}

fn cap_duration(d: ChronoDuration) -> (ChronoDuration, bool) {
    let max = ChronoDuration::days(MAX_DAYS);
    if d > max { (max, true) } else { (d, false) }
}

/// Parses a Go-style duration suffix: a sequence of `<number><unit>` pairs
/// where unit is one of `h`, `m`, `s`. No unit defaults and no negative
/// numbers are accepted (this mirrors the unsigned "time remaining" shape
/// the `ago` flag uses).
fn parse_go_duration(input: &str) -> std::result::Result<ChronoDuration, String> {
    let mut total = ChronoDuration::zero();
    let mut chars = input.char_indices().peekable();
    let mut start = 0;

    while let Some(&(i, c)) = chars.peek() {
        if c.is_ascii_digit() || c == '.' {
            chars.next();
            continue;
        }

        let number_str = &input[start..i];
        if number_str.is_empty() {
            return Err(format!("expected a number before unit at {input:?}"));
        }
        let value: f64 = number_str
            .parse()
            .map_err(|_| format!("invalid number {number_str:?}"))?;

        chars.next();
        let unit = match c {
            'h' => ChronoDuration::milliseconds((value * 3_600_000.0) as i64),
            's' => ChronoDuration::milliseconds((value * 1_000.0) as i64),
            'm' => {
                // Disambiguate "m" (minutes) from "ms" (milliseconds).
                if chars.peek().map(|&(_, c)| c) == Some('s') {
                    chars.next();
                    ChronoDuration::milliseconds(value as i64)
                } else {
                    ChronoDuration::milliseconds((value * 60_000.0) as i64)
                }
            }
            other => return Err(format!("unknown unit {other:?}")),
        };
        total = total + unit;
        start = chars.peek().map(|&(i, _)| i).unwrap_or(input.len());
    }

    if start != input.len() {
        return Err(format!("trailing unparsed input {:?}", &input[start..]));
    }
    if input[..start].is_empty() {
        return Err("empty duration".to_string());
    }

    Ok(total)
}
