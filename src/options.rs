use serde::Deserialize;

/// Options for GPSU to GeoJSON conversion.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertOptions {
    /// Include timestamps in coordinateProperties.times (default: true)
    #[serde(default = "default_true")]
    pub include_time: bool,

    /// Include symbol, comment and text settings in properties (default: true)
    #[serde(default = "default_true")]
    pub include_metadata: bool,

    /// Include distance, duration, speed and centre of each track (default: true)
    #[serde(default = "default_true")]
    pub include_stats: bool,

    /// Which GPSU element types to convert (default: all)
    #[serde(default)]
    pub types: Option<Vec<GpsuElementType>>,

    /// Join all tracks into a single MultiLineString (default: false)
    #[serde(default)]
    pub join_track_segments: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            include_time: true,
            include_metadata: true,
            include_stats: true,
            types: None,
            join_track_segments: false,
        }
    }
}

impl ConvertOptions {
    pub fn should_include(&self, element_type: GpsuElementType) -> bool {
        match &self.types {
            None => true,
            Some(types) => types.contains(&element_type),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpsuElementType {
    Waypoint,
    Route,
    Track,
}

fn default_true() -> bool {
    true
}
