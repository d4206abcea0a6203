pub mod converter;
pub mod coord;
pub mod error;
pub mod gpsu_types;
pub mod options;
pub mod parser;
pub mod scanner;
pub mod schema;
pub mod settings;
pub mod tracks;
pub mod writer;

use wasm_bindgen::prelude::*;

pub use crate::error::{ErrorKind, GpsuError, RecordError};
pub use crate::gpsu_types::{FileModel, Route, Settings, Track, Trackpoint, Waypoint};
pub use crate::options::ConvertOptions;
pub use crate::parser::{decode, parse_gpsu, read_gpsu};
pub use crate::tracks::derive_tracks;
pub use crate::writer::{encode, to_gpsu_string, write_gpsu};

/// Convert GPSU text to GeoJSON, returned as a JS object.
#[wasm_bindgen(js_name = gpsuToGeoJson)]
pub fn gpsu_to_geojson(gpsu_text: &str, options: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let model = parser::parse_gpsu(gpsu_text)?;
    let fc = converter::to_feature_collection(&model, &opts);
    serde_wasm_bindgen::to_value(&fc).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Convert GPSU text to GeoJSON, returned as a JSON string.
#[wasm_bindgen(js_name = gpsuToGeoJsonString)]
pub fn gpsu_to_geojson_string(gpsu_text: &str, options: JsValue) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let model = parser::parse_gpsu(gpsu_text)?;
    let fc = converter::to_feature_collection(&model, &opts);
    serde_json::to_string(&fc).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Summaries of every track in GPSU text, one JS object per track.
#[wasm_bindgen(js_name = gpsuTracks)]
pub fn gpsu_tracks(gpsu_text: &str) -> Result<js_sys::Array, JsValue> {
    console_error_panic_hook::set_once();

    let model = parser::parse_gpsu(gpsu_text)?;
    let out = js_sys::Array::new();
    for track in model.tracks() {
        let value =
            serde_wasm_bindgen::to_value(&track).map_err(|e| JsValue::from_str(&e.to_string()))?;
        out.push(&value);
    }
    Ok(out)
}

/// Decode GPSU text and write it back in canonical layout.
#[wasm_bindgen(js_name = normalizeGpsu)]
pub fn normalize_gpsu(gpsu_text: &str) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let model = parser::parse_gpsu(gpsu_text)?;
    Ok(writer::to_gpsu_string(&model))
}

fn parse_options(options: JsValue) -> Result<ConvertOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(ConvertOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}
