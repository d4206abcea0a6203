use std::fmt::Write as _;
use std::io::Write;

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use log::debug;

use crate::error::GpsuError;
use crate::gpsu_types::*;
use crate::scanner::TIME_FORMAT;
use crate::schema::Field;
use crate::settings::{FILE_TYPE, is_valid_date_format, strftime_to_gpsu};

/// Written instead of the declared date format when that one loses a trackpoint's year.
const FULL_YEAR_DATE_FORMAT: &str = "%d/%m/%Y";

const TRACKPOINT_FIELDS: [Field; 6] = [
    Field::Latitude,
    Field::Longitude,
    Field::Date,
    Field::Time,
    Field::SegFlag,
    Field::Comment,
];

/// Render `model` as GPSU lines (without line terminators).
pub fn encode(model: &FileModel) -> Vec<String> {
    let mut out = Encoder::new(&model.settings, &model.trackpoints);
    out.header();
    out.waypoints(&model.waypoints);
    out.routes(&model.routes, &model.waypoints);
    out.trackpoints(&model.trackpoints);
    debug!("encoded {} lines", out.lines.len());
    out.lines
}

/// Render `model` as the text of a GPSU file.
pub fn to_gpsu_string(model: &FileModel) -> String {
    let mut text = encode(model).join("\n");
    text.push('\n');
    text
}

/// Write `model` to `writer`; a failed write is `IOERR` on the output line it hit.
pub fn write_gpsu<W: Write>(mut writer: W, model: &FileModel) -> Result<(), GpsuError> {
    let lines = encode(model);
    for (i, line) in lines.iter().enumerate() {
        writeln!(writer, "{line}").map_err(|source| GpsuError::Io {
            line: i + 1,
            source,
        })?;
    }
    writer.flush().map_err(|source| GpsuError::Io {
        line: lines.len(),
        source,
    })
}

struct Encoder<'a> {
    settings: &'a Settings,
    date_format: String,
    time_zone: i32,
    offset: FixedOffset,
    lines: Vec<String>,
}

impl<'a> Encoder<'a> {
    fn new(settings: &'a Settings, trackpoints: &[Trackpoint]) -> Self {
        let time_zone = if (-12..=14).contains(&settings.time_zone) {
            settings.time_zone
        } else {
            0
        };
        let offset = FixedOffset::east_opt(time_zone * 3600).unwrap_or_else(|| Utc.fix());
        let declared = if is_valid_date_format(&settings.date_format) {
            settings.date_format.clone()
        } else {
            DEFAULT_DATE_FORMAT.to_string()
        };

        let dates: Vec<NaiveDate> = trackpoints
            .iter()
            .map(|pt| pt.date_time.with_timezone(&offset).date_naive())
            .collect();
        let holds_all = |format: &str| dates.iter().all(|&d| date_reads_back(d, format));
        let date_format = if holds_all(declared.as_str()) {
            declared
        } else {
            let widened = declared.replace("%y", "%Y");
            let chosen = if is_valid_date_format(&widened) && holds_all(widened.as_str()) {
                widened
            } else {
                FULL_YEAR_DATE_FORMAT.to_string()
            };
            debug!("date format '{declared}' loses trackpoint years, writing '{chosen}'");
            chosen
        };

        Self {
            settings,
            date_format,
            time_zone,
            offset,
            lines: Vec::new(),
        }
    }

    fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn header(&mut self) {
        let date_format =
            strftime_to_gpsu(&self.date_format).unwrap_or_else(|| self.date_format.clone());
        self.push("H  SOFTWARE NAME & VERSION");
        self.push(format!(
            "I  {FILE_TYPE} {} {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ));
        self.push("");
        self.push(format!("S DateFormat={date_format}"));
        self.push(format!("S Timezone={:+03}:00", self.time_zone));
        self.push(format!(
            "S Units={},{}",
            self.settings.unit_horz.as_char(),
            self.settings.unit_horz.implied_time_unit().as_char()
        ));
        self.push("");
        self.push("H R DATUM");
        self.push(format!(
            "M E {} 100 0.0000000E+00 0.0000000E+00 0 0 0",
            self.settings.datum
        ));
        self.push("");
        self.push("H  COORDINATE SYSTEM");
        self.push("U  LAT LON DEG");
    }

    fn format_line(&mut self, fields: &[Field]) {
        let names: Vec<&str> = fields.iter().map(|f| f.name()).collect();
        self.push(format!("F {}", names.join(" ")));
    }

    /// A new `F` line is written whenever the fields a waypoint needs change.
    fn waypoints(&mut self, waypoints: &[Waypoint]) {
        if waypoints.is_empty() {
            return;
        }
        self.push("");
        let mut current: Vec<Field> = Vec::new();
        for wp in waypoints {
            let mut fields = vec![Field::Id, Field::Latitude, Field::Longitude];
            if !wp.symbol.is_empty() {
                fields.push(Field::Symbol);
            }
            fields.extend([Field::TextChoice, Field::TextPlace, Field::Comment]);
            if fields != current {
                self.format_line(&fields);
                current = fields;
            }

            let mut line = format!("W {} {}", token(&wp.id), format_coord(&wp.coord));
            if !wp.symbol.is_empty() {
                line.push(' ');
                line.push_str(&token(&wp.symbol));
            }
            line.push_str(&format!(
                " {} {}",
                wp.text_choice.as_char(),
                wp.text_place.octant()
            ));
            push_comment(&mut line, &wp.comment);
            self.push(line);
        }
    }

    /// Each route is closed by a blank line.
    fn routes(&mut self, routes: &[Route], waypoints: &[Waypoint]) {
        if routes.is_empty() {
            return;
        }
        self.push("");
        self.format_line(&[Field::Id]);
        for route in routes {
            let mut line = format!("R {}", route.number);
            push_comment(&mut line, &route.comment);
            self.push(line);
            for wp in route.legs.iter().filter_map(|&i| waypoints.get(i)) {
                self.push(format!("W {}", token(&wp.id)));
            }
            self.push("");
        }
    }

    fn trackpoints(&mut self, trackpoints: &[Trackpoint]) {
        if trackpoints.is_empty() {
            return;
        }
        if self.lines.last().is_some_and(|l| !l.is_empty()) {
            self.push("");
        }
        self.format_line(&TRACKPOINT_FIELDS);
        for pt in trackpoints {
            let local = pt.date_time.with_timezone(&self.offset);
            let mut line = format!(
                "T {} {} {} {}",
                format_coord(&pt.coord),
                local.format(&self.date_format),
                local.format(TIME_FORMAT),
                u8::from(pt.seg_flag)
            );
            if pt.seg_flag {
                push_comment(&mut line, &pt.comment);
            }
            self.push(line);
        }
    }
}

/// Append `comment` the way the scanner reads it back: trimmed, with any
/// separator other than a blank turned into one.
fn push_comment(line: &mut String, comment: &str) {
    let comment: String = comment
        .chars()
        .map(|c| if is_separator(c) { ' ' } else { c })
        .collect();
    let comment = comment.trim_matches(' ');
    if !comment.is_empty() {
        line.push(' ');
        line.push_str(comment);
    }
}

/// A single-token field (`ID`, `Symbol`), with separators replaced by `_`.
fn token(value: &str) -> String {
    value
        .chars()
        .map(|c| if c == ' ' || is_separator(c) { '_' } else { c })
        .collect()
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c.is_control()
}

fn date_reads_back(date: NaiveDate, format: &str) -> bool {
    let mut text = String::new();
    write!(text, "{}", date.format(format)).is_ok()
        && NaiveDate::parse_from_str(&text, format).ok() == Some(date)
}

/// Hemisphere-prefixed degrees in the shortest form that reads back exactly.
fn format_coord(coord: &Coordinate) -> String {
    format!(
        "{} {}",
        format_axis(coord.lat, 'N', 'S'),
        format_axis(coord.lon, 'E', 'W')
    )
}

fn format_axis(value: f64, pos: char, neg: char) -> String {
    let hemisphere = if value.is_sign_negative() { neg } else { pos };
    format!("{hemisphere}{}", value.abs())
}
