#![cfg(target_arch = "wasm32")]

use gpsu_wasm::{gpsu_to_geojson_string, gpsu_tracks, normalize_gpsu};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

const GPSU: &str = "I GPSU
S Timezone=+00:00
F Latitude Longitude Date Time S
T N1 E1 01/02/10 10:00:00 1
T N1.01 E1 01/02/10 10:30:00 0
";

#[wasm_bindgen_test]
fn geojson_string_export() {
    let json = gpsu_to_geojson_string(GPSU, JsValue::UNDEFINED).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["features"][0]["properties"]["gpsuType"], "track");
}

#[wasm_bindgen_test]
fn tracks_export() {
    let tracks = gpsu_tracks(GPSU).unwrap();
    assert_eq!(tracks.length(), 1);
}

#[wasm_bindgen_test]
fn errors_carry_code_and_line() {
    let err = normalize_gpsu("T N1 E1\n").unwrap_err();
    let msg = err.as_string().unwrap();
    assert!(msg.starts_with("line 1: FILTYP"), "{msg}");
}
