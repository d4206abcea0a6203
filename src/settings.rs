//! Records that configure a GPSU file rather than carry data: the `I` file
//! identification, `S` settings changes, the `M` datum and the `U`
//! coordinate system.

use std::fmt::Write;

use chrono::NaiveDate;
use chrono::format::{Item, StrftimeItems};
use log::debug;

use crate::coord::verify_datum;
use crate::error::{ErrorKind, RecordError};
use crate::gpsu_types::{HorizontalUnit, Settings, TimeUnit, WGS84};

type Result<T> = std::result::Result<T, RecordError>;

/// File type token expected on the `I` record.
pub const FILE_TYPE: &str = "GPSU";

fn value_error(message: impl Into<String>) -> RecordError {
    RecordError::new(ErrorKind::Value, message)
}

/// Check the payload of an `I` record (`GPSU 4.20 01 FREEWARE VERSION`).
pub fn verify_file_type(payload: &str) -> Result<()> {
    match payload.split(' ').find(|s| !s.is_empty()) {
        Some(t) if t.eq_ignore_ascii_case(FILE_TYPE) => Ok(()),
        Some(t) => Err(RecordError::new(
            ErrorKind::FileType,
            format!("file type '{t}' is not {FILE_TYPE}"),
        )),
        None => Err(RecordError::new(ErrorKind::FileType, "missing file type")),
    }
}

/// Apply the payload of an `S` record (`key=value`) to `settings`.
pub fn change_settings(payload: &str, settings: &mut Settings) -> Result<()> {
    let (key, value) = payload
        .split_once('=')
        .ok_or_else(|| value_error(format!("settings record '{payload}' has no '='")))?;
    let key = key.trim();
    let value = value.trim();

    if key.eq_ignore_ascii_case("DateFormat") {
        settings.date_format = parse_date_format(value)?;
    } else if key.eq_ignore_ascii_case("Timezone") {
        settings.time_zone = parse_time_zone(value)?;
    } else if key.eq_ignore_ascii_case("Units") {
        settings.set_units(parse_units(value)?);
    } else {
        debug!("ignoring setting '{key}'");
    }
    Ok(())
}

/// Check the payload of an `M` record (`E WGS 84 100 0.0E+00 ...`) and return the datum name.
pub fn parse_datum(payload: &str) -> Result<String> {
    let mut tokens = payload.split(' ').filter(|s| !s.is_empty()).peekable();
    // A single-letter flag precedes the name.
    if tokens.peek().is_some_and(|t| t.len() == 1) {
        tokens.next();
    }
    let name = tokens.collect::<Vec<_>>().join(" ");
    verify_datum(&name)?;
    Ok(WGS84.to_string())
}

/// Check the payload of a `U` record; only decimal-degree lat/lon is supported.
pub fn verify_coord_system(payload: &str) -> Result<()> {
    let tokens: Vec<String> = payload
        .split(' ')
        .filter(|s| !s.is_empty())
        .map(str::to_ascii_uppercase)
        .collect();
    if tokens == ["LAT", "LON", "DEG"] {
        Ok(())
    } else {
        Err(RecordError::new(
            ErrorKind::Coord,
            format!("unsupported coordinate system '{}'", payload.trim()),
        ))
    }
}

/// Turn a GPSU date pattern (`dd/mm/yyyy`) or a literal strftime pattern into strftime.
pub fn parse_date_format(value: &str) -> Result<String> {
    let format = if value.contains('%') {
        value.to_string()
    } else {
        gpsu_to_strftime(value)?
    };
    if !is_valid_date_format(&format) {
        return Err(value_error(format!("unusable date format '{value}'")));
    }
    Ok(format)
}

fn gpsu_to_strftime(pattern: &str) -> Result<String> {
    let mut out = String::new();
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i].to_ascii_lowercase();
        let run = chars[i..]
            .iter()
            .take_while(|x| x.to_ascii_lowercase() == c)
            .count();
        match (c, run) {
            ('d', 2) => out.push_str("%d"),
            ('m', 2) => out.push_str("%m"),
            ('m', 3) => out.push_str("%b"),
            ('y', 2) => out.push_str("%y"),
            ('y', 4) => out.push_str("%Y"),
            ('/' | '-' | '.', 1) => out.push(c),
            _ => {
                return Err(value_error(format!(
                    "bad date pattern '{pattern}' at '{}'",
                    chars[i..i + run].iter().collect::<String>()
                )));
            }
        }
        i += run;
    }
    Ok(out)
}

/// The GPSU pattern for a strftime date format, when it has one.
pub fn strftime_to_gpsu(format: &str) -> Option<String> {
    let mut out = String::new();
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => match chars.next()? {
                'd' => out.push_str("dd"),
                'm' => out.push_str("mm"),
                'b' => out.push_str("mmm"),
                'y' => out.push_str("yy"),
                'Y' => out.push_str("yyyy"),
                _ => return None,
            },
            '/' | '-' | '.' => out.push(c),
            _ => return None,
        }
    }
    Some(out)
}

/// A date format is usable when it renders a date as one blank-free token
/// that parses back to the same date.
pub fn is_valid_date_format(format: &str) -> bool {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return false;
    }
    let Some(sample) = NaiveDate::from_ymd_opt(2001, 2, 3) else {
        return false;
    };
    let mut rendered = String::new();
    if write!(rendered, "{}", sample.format(format)).is_err() {
        return false;
    }
    !rendered.is_empty()
        && !rendered.chars().any(char::is_whitespace)
        && NaiveDate::parse_from_str(&rendered, format).ok() == Some(sample)
}

/// `-05:00`, `+1`, `-12`: whole hours from UTC.
pub fn parse_time_zone(value: &str) -> Result<i32> {
    let bad = || value_error(format!("bad time zone '{value}'"));
    let (hours, minutes) = match value.split_once(':') {
        Some((h, m)) => (h, Some(m)),
        None => (value, None),
    };
    if let Some(m) = minutes {
        if m.len() != 2 || m.parse::<u32>().map_err(|_| bad())? != 0 {
            return Err(bad());
        }
    }
    let digits = hours.trim_start_matches(['+', '-']);
    if digits.is_empty() || digits.len() > 2 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(bad());
    }
    let zone: i32 = hours.parse().map_err(|_| bad())?;
    if !(-12..=14).contains(&zone) {
        return Err(bad());
    }
    Ok(zone)
}

/// `K` or `K,H`: horizontal unit, optionally with the time unit it implies.
pub fn parse_units(value: &str) -> Result<HorizontalUnit> {
    let bad = || value_error(format!("bad units '{value}'"));
    let (horz, time) = match value.split_once(',') {
        Some((h, t)) => (h.trim(), Some(t.trim())),
        None => (value, None),
    };
    let horz = single_char(horz)
        .and_then(HorizontalUnit::from_char)
        .ok_or_else(bad)?;
    if let Some(time) = time {
        let time = single_char(time).and_then(TimeUnit::from_char).ok_or_else(bad)?;
        if time != horz.implied_time_unit() {
            return Err(value_error(format!(
                "time unit '{}' does not go with horizontal unit '{}'",
                time.as_char(),
                horz.as_char()
            )));
        }
    }
    Ok(horz)
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c.to_ascii_uppercase()),
        _ => None,
    }
}
