use chrono::{TimeZone, Utc};
use geojson::{FeatureCollection, Value};
use gpsu_wasm::converter::to_feature_collection;
use gpsu_wasm::error::ErrorKind;
use gpsu_wasm::gpsu_types::{FileModel, HorizontalUnit, TextChoice, TextPlace, TimeUnit};
use gpsu_wasm::options::{ConvertOptions, GpsuElementType};
use gpsu_wasm::parser::{parse_gpsu, read_gpsu};
use gpsu_wasm::writer::to_gpsu_string;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn load_fixture(path: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{path}")).unwrap()
}

fn parse_fixture(path: &str) -> FileModel {
    init_logger();
    parse_gpsu(&load_fixture(path)).unwrap()
}

fn convert(model: &FileModel) -> FeatureCollection {
    to_feature_collection(model, &ConvertOptions::default())
}

fn assert_fixture_fails(path: &str, kind: ErrorKind, line: usize) {
    init_logger();
    let err = parse_gpsu(&load_fixture(path)).unwrap_err();
    assert_eq!(err.kind(), kind, "{path}: {err}");
    assert_eq!(err.line(), line, "{path}: {err}");
}

// ---- basic/ ----

#[test]
fn test_01_waypoints() {
    let model = parse_fixture("basic/01_waypoints.gpsu");
    assert_eq!(model.waypoints.len(), 3);

    let bx = &model.waypoints[0];
    assert_eq!(bx.id, "BOX");
    assert!((bx.coord.lat - 43.54016).abs() < 1e-12);
    assert!((bx.coord.lon + 80.24749).abs() < 1e-12);
    assert_eq!(bx.symbol, "Flag");
    assert_eq!(bx.text_choice, TextChoice::Both);
    assert_eq!(bx.text_place, TextPlace::SW);
    assert_eq!(bx.comment, "boxing club");

    let club = &model.waypoints[1];
    assert_eq!(club.text_choice, TextChoice::Comment);
    assert_eq!(club.text_place, TextPlace::N);
    assert_eq!(club.comment, "");

    let home = &model.waypoints[2];
    assert_eq!(home.symbol, "");
    assert_eq!(home.text_choice, TextChoice::Identifier);
    assert_eq!(home.text_place, TextPlace::E);
    assert_eq!(model.waypoint_index("HOME"), Some(2));
}

#[test]
fn test_02_routes() {
    let model = parse_fixture("basic/02_routes.gpsu");
    assert_eq!(model.waypoints.len(), 4);
    assert_eq!(model.routes.len(), 3);

    let out_and_back = model.route(1).unwrap();
    assert_eq!(out_and_back.comment, "Out and back");
    assert_eq!(out_and_back.legs, [0, 1, 2, 1, 0]);
    let ids: Vec<&str> = model
        .route_waypoints(out_and_back)
        .map(|w| w.id.as_str())
        .collect();
    assert_eq!(ids, ["A", "B", "C", "B", "A"]);

    assert_eq!(model.route(2).unwrap().legs, [2]);
    assert!(model.route(3).unwrap().legs.is_empty());

    // The waypoint after the sealed route is an ordinary waypoint.
    let d = &model.waypoints[3];
    assert_eq!(d.id, "D");
    assert_eq!(d.coord.lat, -1.0);
    assert_eq!(d.coord.lon, -1.0);
}

#[test]
fn test_03_track_metrics() {
    let model = parse_fixture("basic/03_track.gpsu");
    let pts = &model.trackpoints;
    assert_eq!(pts.len(), 3);
    assert_eq!(
        pts[0].date_time,
        Utc.with_ymd_and_hms(2010, 2, 1, 10, 0, 0).unwrap()
    );
    assert_eq!(pts[0].comment, "Up the hill");
    assert_eq!(pts[0].dist, 0.0);
    assert_eq!(pts[2].duration, 3600);

    // 0.01 degree of latitude per half hour.
    let step_km = 6371.0 * 0.01_f64.to_radians();
    assert!((pts[1].dist - step_km).abs() < 1e-9);
    assert!((pts[1].speed - 2.0 * step_km).abs() < 1e-9);

    let tracks = model.tracks();
    assert_eq!(tracks.len(), 1);
    let t = &tracks[0];
    assert_eq!(t.npoints, 3);
    assert_eq!(t.duration, 3600);
    assert!((t.dist - 2.0 * step_km).abs() < 1e-9);
    assert!((t.speed - 2.0 * step_km).abs() < 1e-9);
    assert!((t.mean_coord.lat - 1.01).abs() < 1e-12);
    assert_eq!(t.ne_corner.lat, 1.02);
    assert_eq!(t.sw_corner.lat, 1.0);
}

#[test]
fn test_04_complete() {
    let model = parse_fixture("basic/04_complete.gpsu");
    assert_eq!(model.settings.date_format, "%d/%m/%Y");
    assert_eq!(model.settings.time_zone, 9);
    assert_eq!(model.waypoints.len(), 3);
    assert_eq!(model.routes.len(), 2);
    assert_eq!(model.trackpoints.len(), 5);

    // Local +09:00 stored as UTC.
    assert_eq!(
        model.trackpoints[3].date_time,
        Utc.with_ymd_and_hms(2025, 1, 1, 3, 0, 0).unwrap()
    );
    // Continuation comments are not kept.
    assert_eq!(model.trackpoints[4].comment, "");

    let tracks = model.tracks();
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].start_index, 0);
    assert_eq!(tracks[0].npoints, 3);
    assert_eq!(tracks[1].start_index, 3);
    assert_eq!(tracks[1].npoints, 2);
    assert!((tracks[0].dist - 0.42161637290787).abs() < 1e-9);
    assert!((tracks[0].speed - 2.5296982374472).abs() < 1e-9);
    assert!((tracks[1].speed - 0.36474816552757).abs() < 1e-9);
}

#[test]
fn test_04_complete_geojson() {
    let fc = convert(&parse_fixture("basic/04_complete.gpsu"));
    // 3 waypoints + 2 routes + 2 tracks
    assert_eq!(fc.features.len(), 7);

    let track = &fc.features[5];
    let props = track.properties.as_ref().unwrap();
    assert_eq!(props["gpsuType"], "track");
    assert_eq!(props["start"], "2025-01-01T00:00:00Z");
    assert_eq!(props["end"], "2025-01-01T00:10:00Z");
    assert_eq!(props["duration"], 600);
    assert_eq!(props["distanceUnit"], "K");
    let bbox = track.bbox.as_ref().unwrap();
    assert_eq!(bbox, &vec![139.763, 35.6812, 139.7671, 35.683]);

    if let Value::LineString(coords) = &track.geometry.as_ref().unwrap().value {
        assert_eq!(coords.len(), 3);
    } else {
        panic!("Expected LineString");
    }
}

#[test]
fn test_04_only_routes() {
    let opts = ConvertOptions {
        types: Some(vec![GpsuElementType::Route]),
        ..Default::default()
    };
    let fc = to_feature_collection(&parse_fixture("basic/04_complete.gpsu"), &opts);
    assert_eq!(fc.features.len(), 2);
    for f in &fc.features {
        assert_eq!(f.properties.as_ref().unwrap()["gpsuType"], "route");
    }
}

// ---- settings/ ----

#[test]
fn test_05_metres_and_seconds() {
    let model = parse_fixture("settings/05_metres_utc.gpsu");
    assert_eq!(model.settings.unit_horz, HorizontalUnit::Metres);
    assert_eq!(model.settings.unit_time, TimeUnit::Seconds);
    assert_eq!(model.settings.date_format, "%Y-%m-%d");
    assert_eq!(model.settings.time_zone, 0);

    // Crosses midnight into the next day.
    let pts = &model.trackpoints;
    assert_eq!(pts[1].duration, 60);
    assert!((pts[1].dist - 35.524212056504).abs() < 1e-6);
    assert!((pts[1].speed - 0.59207020094174).abs() < 1e-8);
}

#[test]
fn test_06_empty() {
    let model = parse_fixture("settings/06_empty.gpsu");
    assert_eq!(model, FileModel::default());
    assert!(model.tracks().is_empty());
    assert!(convert(&model).features.is_empty());
}

// ---- errors/ ----

#[test]
fn test_error_no_ident() {
    assert_fixture_fails("errors/no_ident.gpsu", ErrorKind::FileType, 2);
}

#[test]
fn test_error_tab_separator() {
    assert_fixture_fails("errors/tab_separator.gpsu", ErrorKind::BadSeparator, 3);
}

#[test]
fn test_error_unknown_waypoint() {
    assert_fixture_fails("errors/unknown_waypoint.gpsu", ErrorKind::UnknownWaypoint, 8);
}

#[test]
fn test_error_duplicate_route() {
    assert_fixture_fails("errors/duplicate_route.gpsu", ErrorKind::DuplicateRoute, 9);
}

#[test]
fn test_error_no_format() {
    assert_fixture_fails("errors/no_format.gpsu", ErrorKind::NoFormat, 2);
}

#[test]
fn test_error_bad_datum() {
    assert_fixture_fails("errors/bad_datum.gpsu", ErrorKind::Datum, 2);
}

#[test]
fn test_error_bad_coord() {
    assert_fixture_fails("errors/bad_coord.gpsu", ErrorKind::Coord, 3);
}

#[test]
fn test_error_message_names_code_and_line() {
    init_logger();
    let err = parse_gpsu(&load_fixture("errors/duplicate_route.gpsu")).unwrap_err();
    let msg = err.to_string();
    assert!(msg.starts_with("line 9: DUPRT"), "{msg}");
}

// ---- round trip ----

#[test]
fn test_read_file_and_round_trip() {
    init_logger();
    for path in [
        "basic/01_waypoints.gpsu",
        "basic/02_routes.gpsu",
        "basic/03_track.gpsu",
        "basic/04_complete.gpsu",
        "settings/05_metres_utc.gpsu",
        "settings/06_empty.gpsu",
    ] {
        let file = std::fs::File::open(format!("tests/fixtures/{path}")).unwrap();
        let model = read_gpsu(std::io::BufReader::new(file)).unwrap();
        let again = parse_gpsu(&to_gpsu_string(&model)).unwrap();
        assert_eq!(again, model, "{path}");
    }
}
