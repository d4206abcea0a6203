use crate::error::{ErrorKind, RecordError};
use crate::gpsu_types::Coordinate;

type Result<T> = std::result::Result<T, RecordError>;

/// Mean earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Check that `datum` names WGS 84, the only datum GPSU coordinates are accepted in.
///
/// `datum` is the text following the datum flag on an `M` record, so anything
/// after the name (index, shift parameters) is ignored.
pub fn verify_datum(datum: &str) -> Result<()> {
    let normalized = datum
        .split(' ')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase();
    if normalized.starts_with("WGS 84") || normalized.starts_with("WGS84") {
        Ok(())
    } else {
        Err(RecordError::new(
            ErrorKind::Datum,
            format!("unsupported datum '{}'", datum.trim()),
        ))
    }
}

/// Parse and validate a latitude/longitude token pair against `datum`.
///
/// A malformed or out-of-range axis is `COORD` whatever the datum.
pub fn parse_coordinate(lat: &str, lon: &str, datum: &str) -> Result<Coordinate> {
    let lat = parse_degrees(lat, ('N', 'S'), 90.0)?;
    let lon = parse_degrees(lon, ('E', 'W'), 180.0)?;
    verify_datum(datum)?;
    Ok(Coordinate { lat, lon })
}

/// Parse one axis, either hemisphere-prefixed (`N43.5`) or signed (`-43.5`).
fn parse_degrees(token: &str, (pos, neg): (char, char), limit: f64) -> Result<f64> {
    let bad = || {
        RecordError::new(
            ErrorKind::Coord,
            format!("bad coordinate '{token}', expected {pos}/{neg} degrees within {limit}"),
        )
    };

    let (sign, digits) = match token.chars().next() {
        Some(c) if c == pos => (1.0, &token[1..]),
        Some(c) if c == neg => (-1.0, &token[1..]),
        Some('+') => (1.0, &token[1..]),
        Some('-') => (-1.0, &token[1..]),
        Some(_) => (1.0, token),
        None => return Err(bad()),
    };

    let well_formed = !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.chars().filter(|&c| c == '.').count() <= 1
        && digits.chars().any(|c| c.is_ascii_digit());
    if !well_formed {
        return Err(bad());
    }

    let value: f64 = digits.parse().map_err(|_| bad())?;
    if value > limit {
        return Err(bad());
    }
    Ok(sign * value)
}

impl Coordinate {
    /// Great-circle distance to `other` in kilometres (haversine).
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let delta_lat = (other.lat - self.lat).to_radians();
        let delta_lon = (other.lon - self.lon).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_KM * c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hemisphere_prefixed() {
        let c = parse_coordinate("N43.54016", "W080.24749", "WGS 84").unwrap();
        assert!((c.lat - 43.54016).abs() < 1e-12);
        assert!((c.lon + 80.24749).abs() < 1e-12);
    }

    #[test]
    fn test_signed_decimal() {
        let c = parse_coordinate("-33.8688", "+151.2093", "WGS 84").unwrap();
        assert!((c.lat + 33.8688).abs() < 1e-12);
        assert!((c.lon - 151.2093).abs() < 1e-12);

        let c = parse_coordinate("12", "7.", "WGS84").unwrap();
        assert_eq!(c, Coordinate::new(12.0, 7.0));
    }

    #[test]
    fn test_out_of_range() {
        let err = parse_coordinate("95", "10", "WGS 84").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Coord);
        let err = parse_coordinate("10", "-200", "WGS 84").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Coord);
        assert!(parse_coordinate("S90", "E180", "WGS 84").is_ok());
    }

    #[test]
    fn test_out_of_range_wins_over_datum() {
        let err = parse_coordinate("95", "10", "NAD27").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Coord);
        let err = parse_coordinate("10", "-200", "NAD27").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Coord);
        let err = parse_coordinate("10", "20", "NAD27").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Datum);
    }

    #[test]
    fn test_malformed() {
        for (lat, lon) in [
            ("E43.5", "W80"),
            ("N43.5", "N80"),
            ("N", "W80"),
            ("N4x.5", "W80"),
            ("N4.3.5", "W80"),
            ("inf", "0"),
            ("NaN", "0"),
            ("1e1", "0"),
            ("N-43", "0"),
            ("", "0"),
        ] {
            let err = parse_coordinate(lat, lon, "WGS 84").unwrap_err();
            assert_eq!(err.kind, ErrorKind::Coord, "{lat} {lon}");
        }
    }

    #[test]
    fn test_datum() {
        assert!(verify_datum("WGS 84 100  0.0000000E+00").is_ok());
        assert!(verify_datum("wgs   84").is_ok());
        let err = verify_datum("NAD27 CONUS").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Datum);

        let err = parse_coordinate("N43", "W80", "NAD83").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Datum);
    }

    #[test]
    fn test_distance_km() {
        // One degree of latitude along a meridian.
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(1.0, 0.0);
        let expected = 6371.0 * std::f64::consts::PI / 180.0;
        assert!((a.distance_km(&b) - expected).abs() < 1e-9);
        assert_eq!(a.distance_km(&a), 0.0);
    }
}
