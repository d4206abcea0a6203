use std::fmt;

use thiserror::Error;
use wasm_bindgen::JsValue;

/// The closed set of failure kinds a GPSU decode or encode can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input or output channel failure.
    Io,
    /// Unrecognized record-type marker.
    UnknownRecord,
    /// Field separator other than a blank.
    BadSeparator,
    /// Missing, repeated or unsupported file identification.
    FileType,
    /// Unsupported geodetic datum.
    Datum,
    /// Malformed or out-of-range coordinate, or unsupported coordinate system.
    Coord,
    /// Data record before any format declaration for its kind.
    NoFormat,
    /// Unknown field, or required field missing.
    Field,
    /// Field present but with an invalid or out-of-range value.
    Value,
    /// Duplicate route number.
    DuplicateRoute,
    /// Route leg names a waypoint that was never declared.
    UnknownWaypoint,
}

impl ErrorKind {
    /// The literal status code used by GPSU tooling.
    pub fn code(self) -> &'static str {
        match self {
            Self::Io => "IOERR",
            Self::UnknownRecord => "UNKREC",
            Self::BadSeparator => "BADSEP",
            Self::FileType => "FILTYP",
            Self::Datum => "DATUM",
            Self::Coord => "COORD",
            Self::NoFormat => "NOFORM",
            Self::Field => "FIELD",
            Self::Value => "VALUE",
            Self::DuplicateRoute => "DUPRT",
            Self::UnknownWaypoint => "UNKWPT",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Io => "I/O error",
            Self::UnknownRecord => "unknown record type",
            Self::BadSeparator => "bad field separator, only blank allowed",
            Self::FileType => "unacceptable file type",
            Self::Datum => "unacceptable datum",
            Self::Coord => "coordinates in unacceptable format",
            Self::NoFormat => "no format record prior to data records",
            Self::Field => "unknown field, or required field missing",
            Self::Value => "invalid or out-of-range value",
            Self::DuplicateRoute => "duplicate route number",
            Self::UnknownWaypoint => "unknown waypoint ID",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.description())
    }
}

/// A failure found while scanning a single record, before a line number is known.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct RecordError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RecordError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Attach the 1-based line number the record came from.
    pub fn at(self, line: usize) -> GpsuError {
        GpsuError::Record { line, source: self }
    }
}

/// A decode or encode failure, tagged with the 1-based line it happened on.
#[derive(Debug, Error)]
pub enum GpsuError {
    #[error("line {line}: {source}")]
    Record {
        line: usize,
        #[source]
        source: RecordError,
    },
    #[error("line {line}: IOERR (I/O error): {source}")]
    Io {
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

impl GpsuError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Record { source, .. } => source.kind,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Self::Record { line, .. } | Self::Io { line, .. } => *line,
        }
    }
}

impl From<GpsuError> for JsValue {
    fn from(e: GpsuError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}
