use serde::{Deserialize, Serialize};

/// A single face reported by the detection service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    /// Detection certainty, 0-100.
    pub confidence: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub faces: Vec<FaceDetection>,
}

impl DetectionResult {
    pub fn best_confidence(&self) -> Option<f32> {
        self.faces
            .iter()
            .map(|f| f.confidence)
            .fold(None, |best, c| Some(best.map_or(c, |b: f32| b.max(c))))
    }

    /// True when any face scores strictly above `threshold`.
    pub fn has_face_above(&self, threshold: f32) -> bool {
        self.faces.iter().any(|f| f.confidence > threshold)
    }
}

/// Analysis features requested from the text extraction service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureType {
    Forms,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    Page,
    Line,
    Word,
    KeyValueSet,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub block_type: BlockType,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub blocks: Vec<TextBlock>,
}

impl ExtractionResult {
    /// Text of all `LINE` blocks joined by single spaces.
    pub fn line_text(&self) -> String {
        self.blocks
            .iter()
            .filter(|b| b.block_type == BlockType::Line)
            .filter_map(|b| b.text.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
