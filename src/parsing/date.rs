use hifitime::{Epoch, Unit};
use nom::{
    IResult, Parser,
    bytes::complete::take_while_m_n,
    character::complete::char,
    combinator::{eof, map_res},
};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum DateParseError {
    #[error("Unrecognised date '{0}': expected YYYY-Mon-DD (e.g. 2016-Jan-18) or ISO 8601")]
    Unrecognised(String),

    #[error("Invalid date '{input}': {reason}")]
    OutOfRange { input: String, reason: String },
}

fn month_number(abbreviation: &str) -> Result<u8, String> {
    let month = match abbreviation.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        other => return Err(format!("unknown month '{}'", other)),
    };
    Ok(month)
}

fn year(input: &str) -> IResult<&str, i32> {
    map_res(
        take_while_m_n(4, 4, |c: char| c.is_ascii_digit()),
        |s: &str| s.parse::<i32>(),
    )
    .parse(input)
}

fn month(input: &str) -> IResult<&str, u8> {
    map_res(
        take_while_m_n(3, 3, |c: char| c.is_ascii_alphabetic()),
        month_number,
    )
    .parse(input)
}

fn day(input: &str) -> IResult<&str, u8> {
    map_res(
        take_while_m_n(1, 2, |c: char| c.is_ascii_digit()),
        |s: &str| s.parse::<u8>(),
    )
    .parse(input)
}

/// `2016-Jan-18`
fn short_date(input: &str) -> IResult<&str, (i32, u8, u8)> {
    let (rest, (year, _, month, _, day, _)) =
        (year, char('-'), month, char('-'), day, eof).parse(input)?;
    Ok((rest, (year, month, day)))
}

fn out_of_range(input: &str, reason: impl ToString) -> DateParseError {
    DateParseError::OutOfRange {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

fn iso8601_to_epoch(input: &str, dt: iso8601::DateTime) -> Result<Epoch, DateParseError> {
    let iso8601::DateTime { date, time } = dt;
    // Ordinal dates start from January 1st and are shifted below
    let (year, month, day, ordinal_offset) = match date {
        iso8601::Date::YMD { year, month, day } => (year, month as u8, day as u8, 0),
        iso8601::Date::Ordinal { year, ddd } => (year, 1, 1, ddd as i64 - 1),
        iso8601::Date::Week { .. } => {
            return Err(DateParseError::Unrecognised(input.to_string()));
        }
    };
    let iso8601::Time {
        hour,
        minute,
        second,
        millisecond,
        tz_offset_hours,
        tz_offset_minutes,
    } = time;

    let nanos = millisecond * 1_000_000_u32;
    let mut epoch = Epoch::maybe_from_gregorian_utc(
        year,
        month,
        day,
        hour as u8,
        minute as u8,
        second as u8,
        nanos,
    )
    .map_err(|e| out_of_range(input, e))?;

    // Local time minus its offset gives UTC
    if tz_offset_hours != 0 {
        epoch = epoch - Unit::Hour * tz_offset_hours as i64;
    }
    if tz_offset_minutes != 0 {
        epoch = epoch - Unit::Minute * tz_offset_minutes as i64;
    }
    if ordinal_offset != 0 {
        epoch = epoch + Unit::Day * ordinal_offset;
    }

    Ok(epoch)
}

/// Parses a date given on the command line or in the settings.
///
/// Accepted forms, tried in order:
/// - `2016-Jan-18` (midnight UTC)
/// - ISO 8601 datetime, `2016-01-18T06:30:00Z` or with an offset
/// - ISO 8601 calendar or ordinal date, `2016-01-18` or `2016-018`
///   (midnight UTC)
///
/// ISO week dates are not accepted.
pub fn parse_date(input: &str) -> Result<Epoch, DateParseError> {
    let trimmed = input.trim();

    if let Ok((_, (year, month, day))) = short_date(trimmed) {
        return Epoch::maybe_from_gregorian_utc(year, month, day, 0, 0, 0, 0)
            .map_err(|e| out_of_range(trimmed, e));
    }

    if let Ok(dt) = iso8601::datetime(trimmed) {
        return iso8601_to_epoch(trimmed, dt);
    }

    if let Ok(date) = iso8601::date(trimmed) {
        let midnight = iso8601::DateTime {
            date,
            time: iso8601::Time {
                hour: 0,
                minute: 0,
                second: 0,
                millisecond: 0,
                tz_offset_hours: 0,
                tz_offset_minutes: 0,
            },
        };
        return iso8601_to_epoch(trimmed, midnight);
    }

    Err(DateParseError::Unrecognised(trimmed.to_string()))
}
