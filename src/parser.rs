use std::collections::{HashMap, HashSet};
use std::io::BufRead;

use log::{debug, trace};

use crate::error::{ErrorKind, GpsuError, RecordError};
use crate::gpsu_types::*;
use crate::scanner::{check_separators, scan_leg, scan_route, scan_trackpoint, scan_waypoint};
use crate::schema::{RecordKind, SchemaTracker, parse_format};
use crate::settings::{change_settings, parse_datum, verify_coord_system, verify_file_type};
use crate::tracks::update_trackpoint_metrics;

type Result<T> = std::result::Result<T, GpsuError>;

/// Parse the text of a GPSU file into a FileModel.
pub fn parse_gpsu(text: &str) -> Result<FileModel> {
    decode(text.lines())
}

/// Read and parse a GPSU file, reporting read failures as `IOERR` on the failing line.
pub fn read_gpsu<R: BufRead>(reader: R) -> Result<FileModel> {
    let mut decoder = Decoder::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| GpsuError::Io {
            line: i + 1,
            source,
        })?;
        decoder.feed(&line).map_err(|e| e.at(i + 1))?;
    }
    decoder.finish()
}

/// Decode GPSU lines into a FileModel, stopping at the first bad line.
pub fn decode<I, S>(lines: I) -> Result<FileModel>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut decoder = Decoder::new();
    for (i, line) in lines.into_iter().enumerate() {
        decoder.feed(line.as_ref()).map_err(|e| e.at(i + 1))?;
    }
    decoder.finish()
}

/// Decode state for one file. Owns the model being built and the live field layouts.
struct Decoder {
    model: FileModel,
    schemas: SchemaTracker,
    waypoint_ids: HashMap<String, usize>,
    route_numbers: HashSet<u32>,
    open_route: Option<Route>,
    identified: bool,
    lines: usize,
}

impl Decoder {
    fn new() -> Self {
        Self {
            model: FileModel::default(),
            schemas: SchemaTracker::new(),
            waypoint_ids: HashMap::new(),
            route_numbers: HashSet::new(),
            open_route: None,
            identified: false,
            lines: 0,
        }
    }

    fn feed(&mut self, line: &str) -> std::result::Result<(), RecordError> {
        self.lines += 1;
        let line = line.trim_end_matches(['\r', '\n']);
        check_separators(line)?;

        let record = line.trim_start_matches(' ');
        let Some(marker) = record.split(' ').next().filter(|m| !m.is_empty()) else {
            self.seal_route();
            return Ok(());
        };
        let payload = &record[marker.len()..];

        let marker = Marker::parse(marker).ok_or_else(|| {
            RecordError::new(
                ErrorKind::UnknownRecord,
                format!("unknown record type '{marker}'"),
            )
        })?;
        if !matches!(marker, Marker::Waypoint | Marker::Format) {
            self.seal_route();
        }
        if !self.identified && !matches!(marker, Marker::Header | Marker::Ident) {
            return Err(RecordError::new(
                ErrorKind::FileType,
                "file identification record must come first",
            ));
        }

        match marker {
            Marker::Header => {}
            Marker::Ident => {
                if self.identified {
                    return Err(RecordError::new(
                        ErrorKind::FileType,
                        "second file identification record",
                    ));
                }
                verify_file_type(payload)?;
                self.identified = true;
            }
            Marker::Settings => change_settings(payload, &mut self.model.settings)?,
            Marker::Datum => self.model.settings.datum = parse_datum(payload)?,
            Marker::CoordSystem => verify_coord_system(payload)?,
            Marker::Format => self.schemas.declare_pending(parse_format(payload)?),
            Marker::Route => self.start_route(record)?,
            Marker::Waypoint if self.open_route.is_some() => self.add_leg(record)?,
            Marker::Waypoint => self.add_waypoint(record)?,
            Marker::Trackpoint => self.add_trackpoint(record)?,
        }
        Ok(())
    }

    fn add_waypoint(&mut self, record: &str) -> std::result::Result<(), RecordError> {
        let schema = self.schemas.schema_for(RecordKind::Waypoint)?;
        let waypoint = scan_waypoint(record, schema, &self.model.settings.datum)?;
        if self.waypoint_ids.contains_key(&waypoint.id) {
            return Err(RecordError::new(
                ErrorKind::Value,
                format!("duplicate waypoint ID '{}'", waypoint.id),
            ));
        }
        trace!("waypoint {}", waypoint.id);
        self.waypoint_ids
            .insert(waypoint.id.clone(), self.model.waypoints.len());
        self.model.waypoints.push(waypoint);
        Ok(())
    }

    fn start_route(&mut self, record: &str) -> std::result::Result<(), RecordError> {
        let route = scan_route(record)?;
        if !self.route_numbers.insert(route.number) {
            return Err(RecordError::new(
                ErrorKind::DuplicateRoute,
                format!("route {} already defined", route.number),
            ));
        }
        trace!("route {}", route.number);
        self.open_route = Some(route);
        Ok(())
    }

    fn add_leg(&mut self, record: &str) -> std::result::Result<(), RecordError> {
        let schema = self.schemas.schema_for(RecordKind::Leg)?;
        let ids = &self.waypoint_ids;
        if let Some(route) = self.open_route.as_mut() {
            scan_leg(
                record,
                schema,
                &self.model.settings.datum,
                |id| ids.get(id).copied(),
                route,
            )?;
        }
        Ok(())
    }

    fn add_trackpoint(&mut self, record: &str) -> std::result::Result<(), RecordError> {
        let schema = self.schemas.schema_for(RecordKind::Trackpoint)?;
        let point = scan_trackpoint(record, schema, &self.model.settings)?;
        if let Some(prev) = self.model.trackpoints.last() {
            if !point.seg_flag && point.date_time < prev.date_time {
                return Err(RecordError::new(
                    ErrorKind::Value,
                    format!(
                        "trackpoint at {} is earlier than the one before it",
                        point.date_time
                    ),
                ));
            }
        }
        self.model.trackpoints.push(point);
        Ok(())
    }

    fn seal_route(&mut self) {
        if let Some(route) = self.open_route.take() {
            trace!("route {} sealed with {} legs", route.number, route.legs.len());
            self.model.routes.push(route);
        }
    }

    fn finish(mut self) -> Result<FileModel> {
        self.seal_route();
        if !self.identified {
            return Err(RecordError::new(
                ErrorKind::FileType,
                "no file identification record",
            )
            .at(self.lines + 1));
        }
        update_trackpoint_metrics(&self.model.settings, &mut self.model.trackpoints);
        debug!(
            "decoded {} waypoints, {} routes, {} trackpoints from {} lines (layouts for {:?})",
            self.model.waypoints.len(),
            self.model.routes.len(),
            self.model.trackpoints.len(),
            self.lines,
            self.schemas.declared_kinds().collect::<Vec<_>>(),
        );
        Ok(self.model)
    }
}

/// Leading record-type marker of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Header,
    Ident,
    Settings,
    Datum,
    CoordSystem,
    Format,
    Waypoint,
    Route,
    Trackpoint,
}

impl Marker {
    fn parse(token: &str) -> Option<Self> {
        let marker = match token {
            "H" => Self::Header,
            "I" => Self::Ident,
            "S" => Self::Settings,
            "M" => Self::Datum,
            "U" => Self::CoordSystem,
            "F" => Self::Format,
            "W" => Self::Waypoint,
            "R" => Self::Route,
            "T" => Self::Trackpoint,
            _ => return None,
        };
        Some(marker)
    }
}
