use std::fmt;

use crate::error::{ErrorKind, RecordError};

type Result<T> = std::result::Result<T, RecordError>;

/// A field identifier from an `F` format record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Latitude,
    Longitude,
    Symbol,
    /// `T`: text-display-style tag.
    TextChoice,
    /// `O`: text placement octant.
    TextPlace,
    Comment,
    Date,
    Time,
    /// `S`: segment-start flag.
    SegFlag,
}

impl Field {
    /// Parse an identifier, ignoring case and any trailing column-width dashes.
    pub fn parse(token: &str) -> Option<Self> {
        let name = token.trim_end_matches('-');
        let field = match name.to_ascii_uppercase().as_str() {
            "ID" => Self::Id,
            "LATITUDE" => Self::Latitude,
            "LONGITUDE" => Self::Longitude,
            "SYMBOL" => Self::Symbol,
            "T" => Self::TextChoice,
            "O" => Self::TextPlace,
            "COMMENT" => Self::Comment,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "S" => Self::SegFlag,
            _ => return None,
        };
        Some(field)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::Latitude => "Latitude",
            Self::Longitude => "Longitude",
            Self::Symbol => "Symbol",
            Self::TextChoice => "T",
            Self::TextPlace => "O",
            Self::Comment => "Comment",
            Self::Date => "Date",
            Self::Time => "Time",
            Self::SegFlag => "S",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Record kinds whose layout is set by a format declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Waypoint,
    Leg,
    Trackpoint,
}

impl RecordKind {
    const ALL: [RecordKind; 3] = [RecordKind::Waypoint, RecordKind::Leg, RecordKind::Trackpoint];

    fn slot(self) -> usize {
        match self {
            Self::Waypoint => 0,
            Self::Leg => 1,
            Self::Trackpoint => 2,
        }
    }

    pub fn allows(self, field: Field) -> bool {
        use Field::*;
        match self {
            Self::Waypoint | Self::Leg => matches!(
                field,
                Id | Latitude | Longitude | Symbol | TextChoice | TextPlace | Comment
            ),
            Self::Trackpoint => {
                matches!(field, Latitude | Longitude | Date | Time | SegFlag | Comment)
            }
        }
    }

    pub fn required(self) -> &'static [Field] {
        match self {
            Self::Waypoint => &[Field::Id, Field::Latitude, Field::Longitude],
            Self::Leg => &[Field::Id],
            Self::Trackpoint => &[Field::Latitude, Field::Longitude, Field::Date, Field::Time],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Waypoint => "waypoint",
            Self::Leg => "route leg",
            Self::Trackpoint => "trackpoint",
        }
    }
}

/// Parse the identifiers of an `F` record (everything after the marker).
///
/// `Comment` swallows the rest of a data line, so it may only come last.
pub fn parse_format(fields: &str) -> Result<Vec<Field>> {
    let mut schema = Vec::new();
    for token in fields.split(' ').filter(|s| !s.is_empty()) {
        let field = Field::parse(token).ok_or_else(|| {
            RecordError::new(ErrorKind::Field, format!("unknown field '{token}'"))
        })?;
        if schema.contains(&field) {
            return Err(RecordError::new(
                ErrorKind::Field,
                format!("field '{field}' declared twice"),
            ));
        }
        if schema.last() == Some(&Field::Comment) {
            return Err(RecordError::new(
                ErrorKind::Field,
                "'Comment' must be the last field",
            ));
        }
        schema.push(field);
    }
    if schema.is_empty() {
        return Err(RecordError::new(ErrorKind::Field, "format declares no fields"));
    }
    Ok(schema)
}

/// Check a field list against what a record kind accepts and needs.
pub fn check_schema(kind: RecordKind, schema: &[Field]) -> Result<()> {
    if let Some(field) = schema.iter().find(|f| !kind.allows(**f)) {
        return Err(RecordError::new(
            ErrorKind::Field,
            format!("field '{field}' not allowed in {} records", kind.name()),
        ));
    }
    if let Some(field) = kind.required().iter().find(|f| !schema.contains(f)) {
        return Err(RecordError::new(
            ErrorKind::Field,
            format!("{} records require field '{field}'", kind.name()),
        ));
    }
    Ok(())
}

/// Active field layouts for one decode.
///
/// An `F` record is held as pending until the next data record tells which
/// kind it describes; it then replaces that kind's layout.
#[derive(Debug, Default)]
pub struct SchemaTracker {
    active: [Vec<Field>; 3],
    pending: Option<Vec<Field>>,
}

impl SchemaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the layout of an `F` record for the next data record.
    pub fn declare_pending(&mut self, schema: Vec<Field>) {
        self.pending = Some(schema);
    }

    /// Replace the layout for `kind`.
    pub fn declare_schema(&mut self, kind: RecordKind, schema: Vec<Field>) -> Result<()> {
        check_schema(kind, &schema)?;
        self.active[kind.slot()] = schema;
        Ok(())
    }

    /// The layout to scan a `kind` record with, binding any pending declaration first.
    pub fn schema_for(&mut self, kind: RecordKind) -> Result<&[Field]> {
        if let Some(pending) = self.pending.take() {
            self.declare_schema(kind, pending)?;
        }
        self.current_schema(kind)
    }

    pub fn current_schema(&self, kind: RecordKind) -> Result<&[Field]> {
        let schema = &self.active[kind.slot()];
        if schema.is_empty() {
            return Err(RecordError::new(
                ErrorKind::NoFormat,
                format!("{} record before any format record", kind.name()),
            ));
        }
        Ok(schema)
    }

    /// Kinds that currently have a layout.
    pub fn declared_kinds(&self) -> impl Iterator<Item = RecordKind> + '_ {
        RecordKind::ALL
            .into_iter()
            .filter(|k| !self.active[k.slot()].is_empty())
    }
}
