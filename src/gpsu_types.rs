use chrono::{DateTime, Utc};
use serde::Serialize;

/// strftime pattern used when a file declares no `DateFormat` (Canadian convention).
pub const DEFAULT_DATE_FORMAT: &str = "%d/%m/%y";
/// UTC offset in hours used when a file declares no `Timezone` (Eastern time).
pub const DEFAULT_TIME_ZONE: i32 = -5;
/// The only datum GPSU files are accepted in.
pub const WGS84: &str = "WGS 84";

/// Lat/lon in fractional degrees on the WGS 84 datum; south and west are negative.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Text displayed next to a waypoint on a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TextChoice {
    /// `-`
    Hidden,
    /// `I`
    #[default]
    Identifier,
    /// `C`
    Comment,
    /// `&`
    Both,
    /// `+`
    Plus,
    /// `^`
    Caret,
}

impl TextChoice {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '-' => Some(Self::Hidden),
            'I' => Some(Self::Identifier),
            'C' => Some(Self::Comment),
            '&' => Some(Self::Both),
            '+' => Some(Self::Plus),
            '^' => Some(Self::Caret),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Hidden => '-',
            Self::Identifier => 'I',
            Self::Comment => 'C',
            Self::Both => '&',
            Self::Plus => '+',
            Self::Caret => '^',
        }
    }
}

/// Compass octant the waypoint text is placed in, `0 = N` clockwise to `7 = NW`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TextPlace {
    N,
    NE,
    #[default]
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl TextPlace {
    pub fn from_octant(n: u8) -> Option<Self> {
        const ALL: [TextPlace; 8] = [
            TextPlace::N,
            TextPlace::NE,
            TextPlace::E,
            TextPlace::SE,
            TextPlace::S,
            TextPlace::SW,
            TextPlace::W,
            TextPlace::NW,
        ];
        ALL.get(n as usize).copied()
    }

    pub fn octant(self) -> u8 {
        self as u8
    }
}

/// Horizontal (distance) unit declared by the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum HorizontalUnit {
    Metres,
    #[default]
    Kilometres,
    Feet,
    NauticalMiles,
    StatuteMiles,
}

impl HorizontalUnit {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'M' => Some(Self::Metres),
            'K' => Some(Self::Kilometres),
            'F' => Some(Self::Feet),
            'N' => Some(Self::NauticalMiles),
            'S' => Some(Self::StatuteMiles),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Metres => 'M',
            Self::Kilometres => 'K',
            Self::Feet => 'F',
            Self::NauticalMiles => 'N',
            Self::StatuteMiles => 'S',
        }
    }

    /// Small units go with seconds, large units with hours.
    pub fn implied_time_unit(self) -> TimeUnit {
        match self {
            Self::Metres | Self::Feet => TimeUnit::Seconds,
            Self::Kilometres | Self::NauticalMiles | Self::StatuteMiles => TimeUnit::Hours,
        }
    }

    /// How many of this unit make up one kilometre.
    pub fn per_kilometre(self) -> f64 {
        match self {
            Self::Metres => 1000.0,
            Self::Kilometres => 1.0,
            Self::Feet => 1000.0 / 0.3048,
            Self::NauticalMiles => 1.0 / 1.852,
            Self::StatuteMiles => 1.0 / 1.609344,
        }
    }
}

/// Time unit speeds are expressed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TimeUnit {
    Seconds,
    #[default]
    Hours,
}

impl TimeUnit {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'S' => Some(Self::Seconds),
            'H' => Some(Self::Hours),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Seconds => 'S',
            Self::Hours => 'H',
        }
    }

    pub fn seconds(self) -> f64 {
        match self {
            Self::Seconds => 1.0,
            Self::Hours => 3600.0,
        }
    }
}

/// Settings declared by `S`, `M` records. `Default` gives the values a file
/// starts with before any settings record is seen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    /// strftime pattern for the date part of trackpoint timestamps.
    pub date_format: String,
    /// Offset of local file times from UTC, in whole hours.
    pub time_zone: i32,
    pub unit_horz: HorizontalUnit,
    /// Always `unit_horz.implied_time_unit()`.
    pub unit_time: TimeUnit,
    pub datum: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            time_zone: DEFAULT_TIME_ZONE,
            unit_horz: HorizontalUnit::Kilometres,
            unit_time: TimeUnit::Hours,
            datum: WGS84.to_string(),
        }
    }
}

impl Settings {
    /// Set the horizontal unit together with the time unit it implies.
    pub fn set_units(&mut self, unit: HorizontalUnit) {
        self.unit_horz = unit;
        self.unit_time = unit.implied_time_unit();
    }
}

/// A named position (`W` record outside a route).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Waypoint {
    pub id: String,
    pub coord: Coordinate,
    pub symbol: String,
    pub text_choice: TextChoice,
    pub text_place: TextPlace,
    pub comment: String,
}

impl Waypoint {
    pub fn new(id: impl Into<String>, coord: Coordinate) -> Self {
        Self {
            id: id.into(),
            coord,
            symbol: String::new(),
            text_choice: TextChoice::default(),
            text_place: TextPlace::default(),
            comment: String::new(),
        }
    }
}

/// A numbered route. `legs` are subscripts into `FileModel::waypoints`, in travel order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Route {
    pub number: u32,
    pub comment: String,
    pub legs: Vec<usize>,
}

/// A logged position (`T` record).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trackpoint {
    pub coord: Coordinate,
    pub date_time: DateTime<Utc>,
    /// Starts a new segment.
    pub seg_flag: bool,
    /// Always empty when `seg_flag` is false.
    pub comment: String,
    /// Average speed from the previous point, horizontal units per time unit.
    pub speed: f64,
    /// Distance from the previous point, in horizontal units.
    pub dist: f64,
    /// Seconds since the start of the segment.
    pub duration: i64,
}

impl Trackpoint {
    pub fn new(coord: Coordinate, date_time: DateTime<Utc>, seg_flag: bool) -> Self {
        Self {
            coord,
            date_time,
            seg_flag,
            comment: String::new(),
            speed: 0.0,
            dist: 0.0,
            duration: 0,
        }
    }
}

/// Summary of one segment of trackpoints. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    /// 1-based, in file order.
    pub seqno: usize,
    /// Subscript of the first trackpoint of the segment.
    pub start_index: usize,
    pub npoints: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Seconds.
    pub duration: i64,
    /// Horizontal units.
    pub dist: f64,
    /// Horizontal units per time unit.
    pub speed: f64,
    pub ne_corner: Coordinate,
    pub sw_corner: Coordinate,
    pub mean_coord: Coordinate,
}

/// An entire GPSU file in memory.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FileModel {
    pub settings: Settings,
    pub waypoints: Vec<Waypoint>,
    pub routes: Vec<Route>,
    pub trackpoints: Vec<Trackpoint>,
}

impl FileModel {
    pub fn waypoint_index(&self, id: &str) -> Option<usize> {
        self.waypoints.iter().position(|w| w.id == id)
    }

    pub fn route(&self, number: u32) -> Option<&Route> {
        self.routes.iter().find(|r| r.number == number)
    }

    /// Waypoints visited by `route`, in order.
    pub fn route_waypoints<'a>(&'a self, route: &'a Route) -> impl Iterator<Item = &'a Waypoint> {
        route.legs.iter().filter_map(|&i| self.waypoints.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let s = Settings::default();
        assert_eq!(s.date_format, "%d/%m/%y");
        assert_eq!(s.time_zone, -5);
        assert_eq!(s.unit_horz, HorizontalUnit::Kilometres);
        assert_eq!(s.unit_time, TimeUnit::Hours);
    }

    #[test]
    fn test_implied_time_unit() {
        let mut s = Settings::default();
        s.set_units(HorizontalUnit::Feet);
        assert_eq!(s.unit_time, TimeUnit::Seconds);
        s.set_units(HorizontalUnit::StatuteMiles);
        assert_eq!(s.unit_time, TimeUnit::Hours);
    }

    #[test]
    fn test_text_place_octants() {
        assert_eq!(TextPlace::from_octant(0), Some(TextPlace::N));
        assert_eq!(TextPlace::from_octant(7), Some(TextPlace::NW));
        assert_eq!(TextPlace::from_octant(8), None);
        assert_eq!(TextPlace::default().octant(), 2);
    }

    #[test]
    fn test_waypoint_defaults() {
        let w = Waypoint::new("HOME", Coordinate::new(43.5, -80.25));
        assert_eq!(w.symbol, "");
        assert_eq!(w.text_choice.as_char(), 'I');
        assert_eq!(w.text_place, TextPlace::E);
        assert_eq!(w.comment, "");
    }

    #[test]
    fn test_route_waypoints_in_leg_order() {
        let model = FileModel {
            waypoints: vec![
                Waypoint::new("A", Coordinate::new(1.0, 1.0)),
                Waypoint::new("B", Coordinate::new(2.0, 2.0)),
            ],
            routes: vec![Route {
                number: 4,
                comment: String::new(),
                legs: vec![1, 0, 1],
            }],
            ..Default::default()
        };
        let route = model.route(4).unwrap();
        let ids: Vec<&str> = model.route_waypoints(route).map(|w| w.id.as_str()).collect();
        assert_eq!(ids, ["B", "A", "B"]);
        assert_eq!(model.waypoint_index("B"), Some(1));
        assert!(model.route(5).is_none());
    }
}
