use chrono::{DateTime, Utc};

use crate::gpsu_types::*;

/// Fill in `dist`, `speed` and `duration` of every trackpoint from its
/// coordinates and timestamps, in the units declared by `settings`.
///
/// A segment-start point (and the first point overall) gets zeros.
pub fn update_trackpoint_metrics(settings: &Settings, points: &mut [Trackpoint]) {
    let unit_scale = settings.unit_horz.per_kilometre();
    let time_scale = settings.unit_time.seconds();
    let mut prev: Option<(Coordinate, DateTime<Utc>)> = None;
    let mut seg_start: Option<DateTime<Utc>> = None;

    for pt in points.iter_mut() {
        match prev {
            Some((coord, time)) if !pt.seg_flag => {
                pt.dist = coord.distance_km(&pt.coord) * unit_scale;
                let elapsed = (pt.date_time - time).num_seconds();
                pt.speed = if elapsed > 0 {
                    pt.dist / (elapsed as f64 / time_scale)
                } else {
                    0.0
                };
                pt.duration = seg_start.map_or(0, |start| (pt.date_time - start).num_seconds());
            }
            _ => {
                pt.dist = 0.0;
                pt.speed = 0.0;
                pt.duration = 0;
                seg_start = Some(pt.date_time);
            }
        }
        prev = Some((pt.coord, pt.date_time));
    }
}

/// Running totals for the track currently being walked.
struct TrackAccumulator {
    seqno: usize,
    start_index: usize,
    npoints: usize,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    dist: f64,
    ne: Coordinate,
    sw: Coordinate,
    lat_sum: f64,
    lon_sum: f64,
}

impl TrackAccumulator {
    fn new(seqno: usize, start_index: usize, first: &Trackpoint) -> Self {
        Self {
            seqno,
            start_index,
            npoints: 0,
            start: first.date_time,
            end: first.date_time,
            dist: 0.0,
            ne: first.coord,
            sw: first.coord,
            lat_sum: 0.0,
            lon_sum: 0.0,
        }
    }

    fn add(&mut self, pt: &Trackpoint) {
        self.npoints += 1;
        self.end = pt.date_time;
        self.dist += pt.dist;
        self.ne.lat = self.ne.lat.max(pt.coord.lat);
        self.ne.lon = self.ne.lon.max(pt.coord.lon);
        self.sw.lat = self.sw.lat.min(pt.coord.lat);
        self.sw.lon = self.sw.lon.min(pt.coord.lon);
        self.lat_sum += pt.coord.lat;
        self.lon_sum += pt.coord.lon;
    }

    fn finish(self, time_unit: TimeUnit) -> Track {
        let duration = (self.end - self.start).num_seconds();
        let speed = if duration > 0 {
            self.dist / (duration as f64 / time_unit.seconds())
        } else {
            0.0
        };
        let n = self.npoints as f64;
        Track {
            seqno: self.seqno,
            start_index: self.start_index,
            npoints: self.npoints,
            start: self.start,
            end: self.end,
            duration,
            dist: self.dist,
            speed,
            ne_corner: self.ne,
            sw_corner: self.sw,
            mean_coord: Coordinate::new(self.lat_sum / n, self.lon_sum / n),
        }
    }
}

/// Split the trackpoints of `model` into tracks at each segment-start flag and
/// summarize each one. Single forward pass.
pub fn derive_tracks(model: &FileModel) -> Vec<Track> {
    let time_unit = model.settings.unit_time;
    let mut tracks = Vec::new();
    let mut current: Option<TrackAccumulator> = None;

    for (i, pt) in model.trackpoints.iter().enumerate() {
        if pt.seg_flag || current.is_none() {
            if let Some(done) = current.take() {
                tracks.push(done.finish(time_unit));
            }
            current = Some(TrackAccumulator::new(tracks.len() + 1, i, pt));
        }
        if let Some(acc) = current.as_mut() {
            acc.add(pt);
        }
    }
    if let Some(done) = current {
        tracks.push(done.finish(time_unit));
    }
    tracks
}

impl FileModel {
    /// Tracks summarizing the trackpoint segments, recomputed on every call.
    pub fn tracks(&self) -> Vec<Track> {
        derive_tracks(self)
    }

    /// Recompute per-point distance, speed and duration after editing trackpoints or units.
    pub fn update_trackpoint_metrics(&mut self) {
        update_trackpoint_metrics(&self.settings, &mut self.trackpoints);
    }
}
