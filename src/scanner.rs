use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use log::trace;

use crate::coord::parse_coordinate;
use crate::error::{ErrorKind, RecordError};
use crate::gpsu_types::*;
use crate::schema::{Field, RecordKind, check_schema};

type Result<T> = std::result::Result<T, RecordError>;

/// Time-of-day layout of the `Time` trackpoint field.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Reject any separator other than a blank.
pub fn check_separators(line: &str) -> Result<()> {
    match line.chars().find(|&c| c != ' ' && (c.is_whitespace() || c.is_control())) {
        Some(c) => Err(RecordError::new(
            ErrorKind::BadSeparator,
            format!("separator {c:?} not allowed, only blank"),
        )),
        None => Ok(()),
    }
}

/// Blank-separated fields of one record, positioned after the record marker.
#[derive(Debug)]
pub struct Fields<'a> {
    rest: &'a str,
}

impl<'a> Fields<'a> {
    pub fn new(line: &'a str) -> Result<Self> {
        check_separators(line)?;
        let mut fields = Self { rest: line };
        fields.next_token();
        Ok(fields)
    }

    pub fn next_token(&mut self) -> Option<&'a str> {
        let rest = self.rest.trim_start_matches(' ');
        if rest.is_empty() {
            self.rest = rest;
            return None;
        }
        let end = rest.find(' ').unwrap_or(rest.len());
        let (token, rest) = rest.split_at(end);
        self.rest = rest;
        Some(token)
    }

    /// Everything left on the line, trimmed.
    pub fn remainder(&mut self) -> &'a str {
        let rest = self.rest.trim_matches(' ');
        self.rest = "";
        rest
    }

    fn expect(&mut self, field: Field) -> Result<&'a str> {
        self.next_token().ok_or_else(|| {
            RecordError::new(ErrorKind::Field, format!("missing value for field '{field}'"))
        })
    }

    fn finish(mut self) -> Result<()> {
        match self.next_token() {
            None => Ok(()),
            Some(token) => Err(RecordError::new(
                ErrorKind::Field,
                format!("unexpected extra field '{token}'"),
            )),
        }
    }
}

/// Raw field values of a waypoint, leg or trackpoint record, keyed by identifier.
#[derive(Debug, Default)]
struct RawRecord<'a> {
    id: Option<&'a str>,
    lat: Option<&'a str>,
    lon: Option<&'a str>,
    symbol: Option<&'a str>,
    text_choice: Option<&'a str>,
    text_place: Option<&'a str>,
    comment: Option<&'a str>,
    date: Option<&'a str>,
    time: Option<&'a str>,
    seg_flag: Option<&'a str>,
}

impl<'a> RawRecord<'a> {
    /// Walk `schema` in order, taking one token per field.
    fn split(line: &'a str, schema: &[Field], kind: RecordKind) -> Result<Self> {
        check_schema(kind, schema)?;
        let mut fields = Fields::new(line)?;
        let mut raw = Self::default();
        for &field in schema {
            let slot = match field {
                Field::Comment => {
                    raw.comment = Some(fields.remainder());
                    continue;
                }
                Field::Id => &mut raw.id,
                Field::Latitude => &mut raw.lat,
                Field::Longitude => &mut raw.lon,
                Field::Symbol => &mut raw.symbol,
                Field::TextChoice => &mut raw.text_choice,
                Field::TextPlace => &mut raw.text_place,
                Field::Date => &mut raw.date,
                Field::Time => &mut raw.time,
                Field::SegFlag => &mut raw.seg_flag,
            };
            *slot = Some(fields.expect(field)?);
        }
        fields.finish()?;
        Ok(raw)
    }

    fn required(value: Option<&'a str>, field: Field) -> Result<&'a str> {
        value.ok_or_else(|| {
            RecordError::new(ErrorKind::Field, format!("required field '{field}' missing"))
        })
    }

    fn coordinate(&self, datum: &str) -> Result<Coordinate> {
        let lat = Self::required(self.lat, Field::Latitude)?;
        let lon = Self::required(self.lon, Field::Longitude)?;
        parse_coordinate(lat, lon, datum)
    }

    fn text_choice(&self) -> Result<TextChoice> {
        let Some(token) = self.text_choice else {
            return Ok(TextChoice::default());
        };
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => TextChoice::from_char(c),
            _ => None,
        }
        .ok_or_else(|| {
            RecordError::new(
                ErrorKind::Value,
                format!("text choice '{token}' is not one of - I C & + ^"),
            )
        })
    }

    fn text_place(&self) -> Result<TextPlace> {
        let Some(token) = self.text_place else {
            return Ok(TextPlace::default());
        };
        token
            .parse::<u8>()
            .ok()
            .and_then(TextPlace::from_octant)
            .ok_or_else(|| {
                RecordError::new(
                    ErrorKind::Value,
                    format!("text placement '{token}' is not 0-7"),
                )
            })
    }
}

/// Scan a waypoint `W` record laid out by `schema`.
pub fn scan_waypoint(line: &str, schema: &[Field], datum: &str) -> Result<Waypoint> {
    let raw = RawRecord::split(line, schema, RecordKind::Waypoint)?;
    let id = RawRecord::required(raw.id, Field::Id)?;
    Ok(Waypoint {
        id: id.to_string(),
        coord: raw.coordinate(datum)?,
        symbol: raw.symbol.unwrap_or_default().to_string(),
        text_choice: raw.text_choice()?,
        text_place: raw.text_place()?,
        comment: raw.comment.unwrap_or_default().to_string(),
    })
}

/// Scan an `R` route header: `R <number> [comment...]`.
pub fn scan_route(line: &str) -> Result<Route> {
    let mut fields = Fields::new(line)?;
    let token = fields
        .next_token()
        .ok_or_else(|| RecordError::new(ErrorKind::Field, "route number missing"))?;
    let number = token.parse::<u32>().map_err(|_| {
        RecordError::new(ErrorKind::Value, format!("bad route number '{token}'"))
    })?;
    Ok(Route {
        number,
        comment: fields.remainder().to_string(),
        legs: Vec::new(),
    })
}

/// Scan a `W` record inside a route and append the waypoint it names to `route`.
///
/// `resolve` maps a waypoint identifier to its subscript in the waypoint
/// collection. Fields other than the identifier are checked but not kept.
pub fn scan_leg(
    line: &str,
    schema: &[Field],
    datum: &str,
    resolve: impl Fn(&str) -> Option<usize>,
    route: &mut Route,
) -> Result<()> {
    let raw = RawRecord::split(line, schema, RecordKind::Leg)?;
    let id = RawRecord::required(raw.id, Field::Id)?;
    if raw.lat.is_some() || raw.lon.is_some() {
        raw.coordinate(datum)?;
    }
    raw.text_choice()?;
    raw.text_place()?;

    let index = resolve(id).ok_or_else(|| {
        RecordError::new(
            ErrorKind::UnknownWaypoint,
            format!("route {} names unknown waypoint '{id}'", route.number),
        )
    })?;
    route.legs.push(index);
    Ok(())
}

/// Scan a `T` trackpoint record, reading its date and time in the live settings.
///
/// The derived `dist`, `speed` and `duration` are left at zero.
pub fn scan_trackpoint(line: &str, schema: &[Field], settings: &Settings) -> Result<Trackpoint> {
    let raw = RawRecord::split(line, schema, RecordKind::Trackpoint)?;
    let coord = raw.coordinate(&settings.datum)?;

    let date = RawRecord::required(raw.date, Field::Date)?;
    let time = RawRecord::required(raw.time, Field::Time)?;
    let date = NaiveDate::parse_from_str(date, &settings.date_format).map_err(|e| {
        RecordError::new(
            ErrorKind::Value,
            format!("bad date '{date}' for format '{}': {e}", settings.date_format),
        )
    })?;
    let time = NaiveTime::parse_from_str(time, TIME_FORMAT)
        .map_err(|e| RecordError::new(ErrorKind::Value, format!("bad time '{time}': {e}")))?;
    let date_time = FixedOffset::east_opt(settings.time_zone * 3600)
        .and_then(|zone| zone.from_local_datetime(&date.and_time(time)).single())
        .ok_or_else(|| {
            RecordError::new(
                ErrorKind::Value,
                format!("bad time zone {}", settings.time_zone),
            )
        })?
        .with_timezone(&Utc);

    let seg_flag = match raw.seg_flag {
        None | Some("0") => false,
        Some("1") => true,
        Some(token) => {
            return Err(RecordError::new(
                ErrorKind::Value,
                format!("segment flag '{token}' is not 0 or 1"),
            ));
        }
    };

    let mut point = Trackpoint::new(coord, date_time, seg_flag);
    match raw.comment {
        Some(comment) if seg_flag => point.comment = comment.to_string(),
        Some(comment) if !comment.is_empty() => {
            trace!("dropping comment '{comment}' on continuation trackpoint");
        }
        _ => {}
    }
    Ok(point)
}
