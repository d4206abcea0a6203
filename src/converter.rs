use chrono::SecondsFormat;
use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{Map, Value as JsonValue};

use crate::gpsu_types::*;
use crate::options::{ConvertOptions, GpsuElementType};
use crate::tracks::derive_tracks;

/// Convert a decoded GPSU file to a GeoJSON FeatureCollection.
pub fn to_feature_collection(model: &FileModel, opts: &ConvertOptions) -> FeatureCollection {
    let mut features = Vec::new();

    if opts.should_include(GpsuElementType::Waypoint) {
        for wpt in &model.waypoints {
            features.push(waypoint_to_feature(wpt, opts));
        }
    }

    if opts.should_include(GpsuElementType::Route) {
        for rte in &model.routes {
            features.extend(route_to_feature(model, rte, opts));
        }
    }

    if opts.should_include(GpsuElementType::Track) {
        features.extend(tracks_to_features(model, opts));
    }

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn waypoint_to_feature(wpt: &Waypoint, opts: &ConvertOptions) -> Feature {
    let mut props = base_props("waypoint");
    props.insert("id".to_string(), JsonValue::String(wpt.id.clone()));

    if opts.include_metadata {
        insert_non_empty(&mut props, "symbol", &wpt.symbol);
        insert_non_empty(&mut props, "comment", &wpt.comment);
        props.insert(
            "textChoice".to_string(),
            JsonValue::String(wpt.text_choice.as_char().to_string()),
        );
        props.insert(
            "textPlace".to_string(),
            JsonValue::from(wpt.text_place.octant()),
        );
    }

    feature(Value::Point(position(&wpt.coord)), props)
}

/// Routes with one leg become a Point, routes with none are skipped.
fn route_to_feature(model: &FileModel, rte: &Route, opts: &ConvertOptions) -> Option<Feature> {
    let stops: Vec<&Waypoint> = model.route_waypoints(rte).collect();
    let geometry = match stops.as_slice() {
        [] => return None,
        [only] => Value::Point(position(&only.coord)),
        _ => Value::LineString(stops.iter().map(|w| position(&w.coord)).collect()),
    };

    let mut props = base_props("route");
    props.insert("number".to_string(), JsonValue::from(rte.number));

    if opts.include_metadata {
        insert_non_empty(&mut props, "comment", &rte.comment);
        props.insert(
            "waypoints".to_string(),
            JsonValue::Array(
                stops
                    .iter()
                    .map(|w| JsonValue::String(w.id.clone()))
                    .collect(),
            ),
        );
    }

    Some(feature(geometry, props))
}

fn tracks_to_features(model: &FileModel, opts: &ConvertOptions) -> Vec<Feature> {
    let tracks = derive_tracks(model);
    let segments: Vec<(&Track, &[Trackpoint])> = tracks
        .iter()
        .map(|t| (t, &model.trackpoints[t.start_index..t.start_index + t.npoints]))
        .collect();

    if opts.join_track_segments && segments.len() > 1 {
        return joined_track_feature(model, &segments, opts).into_iter().collect();
    }

    segments
        .iter()
        .map(|(track, points)| {
            let geometry = match points {
                [only] => Value::Point(position(&only.coord)),
                _ => Value::LineString(points.iter().map(|p| position(&p.coord)).collect()),
            };

            let mut props = base_props("track");
            props.insert("seqno".to_string(), JsonValue::from(track.seqno));
            if opts.include_metadata {
                if let Some(first) = points.first() {
                    insert_non_empty(&mut props, "comment", &first.comment);
                }
            }
            if opts.include_stats {
                insert_track_stats(&mut props, track, &model.settings);
            }
            if opts.include_time && points.len() > 1 {
                insert_coordinate_times(&mut props, JsonValue::Array(times(points)));
            }

            let mut f = feature(geometry, props);
            if opts.include_stats {
                f.bbox = Some(vec![
                    track.sw_corner.lon,
                    track.sw_corner.lat,
                    track.ne_corner.lon,
                    track.ne_corner.lat,
                ]);
            }
            f
        })
        .collect()
}

/// All tracks with at least two points as one MultiLineString.
fn joined_track_feature(
    model: &FileModel,
    segments: &[(&Track, &[Trackpoint])],
    opts: &ConvertOptions,
) -> Option<Feature> {
    let lines: Vec<&[Trackpoint]> = segments
        .iter()
        .map(|(_, points)| *points)
        .filter(|points| points.len() >= 2)
        .collect();
    if lines.is_empty() {
        return None;
    }

    let geometry = Value::MultiLineString(
        lines
            .iter()
            .map(|points| points.iter().map(|p| position(&p.coord)).collect())
            .collect(),
    );

    let mut props = base_props("track");
    props.insert("tracks".to_string(), JsonValue::from(lines.len()));
    if opts.include_stats {
        let dist: f64 = segments.iter().map(|(t, _)| t.dist).sum();
        props.insert("distance".to_string(), JsonValue::from(dist));
        props.insert(
            "distanceUnit".to_string(),
            JsonValue::String(model.settings.unit_horz.as_char().to_string()),
        );
    }
    if opts.include_time {
        let all_times = lines
            .iter()
            .map(|points| JsonValue::Array(times(points)))
            .collect();
        insert_coordinate_times(&mut props, JsonValue::Array(all_times));
    }

    Some(feature(geometry, props))
}

fn feature(value: Value, props: Map<String, JsonValue>) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

fn base_props(gpsu_type: &str) -> Map<String, JsonValue> {
    let mut props = Map::new();
    props.insert(
        "gpsuType".to_string(),
        JsonValue::String(gpsu_type.to_string()),
    );
    props
}

/// Build a [lon, lat] coordinate array.
fn position(coord: &Coordinate) -> Vec<f64> {
    vec![coord.lon, coord.lat]
}

fn insert_non_empty(props: &mut Map<String, JsonValue>, key: &str, value: &str) {
    if !value.is_empty() {
        props.insert(key.to_string(), JsonValue::String(value.to_string()));
    }
}

fn insert_track_stats(props: &mut Map<String, JsonValue>, track: &Track, settings: &Settings) {
    props.insert("start".to_string(), JsonValue::String(rfc3339(track.start)));
    props.insert("end".to_string(), JsonValue::String(rfc3339(track.end)));
    props.insert("duration".to_string(), JsonValue::from(track.duration));
    props.insert("distance".to_string(), JsonValue::from(track.dist));
    props.insert("speed".to_string(), JsonValue::from(track.speed));
    props.insert(
        "distanceUnit".to_string(),
        JsonValue::String(settings.unit_horz.as_char().to_string()),
    );
    props.insert(
        "timeUnit".to_string(),
        JsonValue::String(settings.unit_time.as_char().to_string()),
    );
    props.insert(
        "meanCoord".to_string(),
        JsonValue::from(position(&track.mean_coord)),
    );
}

fn times(points: &[Trackpoint]) -> Vec<JsonValue> {
    points
        .iter()
        .map(|p| JsonValue::String(rfc3339(p.date_time)))
        .collect()
}

fn rfc3339(t: chrono::DateTime<chrono::Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn insert_coordinate_times(props: &mut Map<String, JsonValue>, times: JsonValue) {
    let mut coord_props = Map::new();
    coord_props.insert("times".to_string(), times);
    props.insert(
        "coordinateProperties".to_string(),
        JsonValue::Object(coord_props),
    );
}
