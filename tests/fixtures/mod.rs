//! Scenario data shared by the pipeline tests

#![allow(dead_code)]

/// Pool and sample used by the reference scenario.
pub const POOL_SIZE: u32 = 12;
pub const SAMPLE_SIZE: u32 = 10;
pub const CONFIDENCE_THRESHOLD: f32 = 75.0;
pub const TARGET_PHRASE: &str = "DRIVER LICENSE";

/// Images whose best face scores 90; every other image scores 10.
pub const FACE_KEYS: &[u32] = &[2, 5, 9];
pub const FACE_CONFIDENCE: f32 = 90.0;
pub const BACKGROUND_CONFIDENCE: f32 = 10.0;

/// Text the extraction service reports per image. Keys not listed have no text.
pub const EXTRACTED_TEXT: &[(&str, &str)] = &[
    ("5.jpg", "DRIVER LICENSE CLASS D"),
    ("9.jpg", "RECEIPT TOTAL $5.00"),
    ("4.jpg", "state of ohio Driver License"),
];

/// Bytes served for an image. The fake vision services read the key back
/// out of the image content.
pub fn image_bytes(key: &str) -> Vec<u8> {
    key.as_bytes().to_vec()
}

pub fn confidence_for(key: &str) -> f32 {
    let is_face = FACE_KEYS
        .iter()
        .any(|n| format!("{n}.jpg") == key);
    if is_face {
        FACE_CONFIDENCE
    } else {
        BACKGROUND_CONFIDENCE
    }
}

pub fn text_for(key: &str) -> Option<&'static str> {
    EXTRACTED_TEXT
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, text)| *text)
}
