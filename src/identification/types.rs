//! Identification result wire types.
//!
//! The JSON shape is fixed by the identification service contract:
//!
//! ```json
//! {
//!   "name": "Paracetamol", "dosage": "500mg", "manufacturer": "...",
//!   "activeIngredient": "...", "uses": "...", "sideEffects": "...",
//!   "confidence": { "overall": 94.5, "yoloDetection": 96.8, "ocrAccuracy": 92.3 },
//!   "aiModels": { "detectionModel": "YOLOv8", "ocrModel": "Tesseract OCR" },
//!   "extractedText": "PARACETAMOL 500MG ..."
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Structured identification of a medicine package. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationResult {
    pub name: String,
    pub dosage: String,
    pub manufacturer: String,
    pub active_ingredient: String,
    pub uses: String,
    pub side_effects: String,
    pub confidence: Confidence,
    #[serde(rename = "aiModels")]
    pub models: ModelsUsed,
    pub extracted_text: String,
}

/// Confidence percentages, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    pub overall: f64,
    #[serde(rename = "yoloDetection")]
    pub detection_confidence: f64,
    #[serde(rename = "ocrAccuracy")]
    pub extraction_confidence: f64,
}

/// Free-text identifiers of the models that produced the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelsUsed {
    #[serde(rename = "detectionModel")]
    pub detection_model: String,
    #[serde(rename = "ocrModel")]
    pub text_extraction_model: String,
}

impl Confidence {
    fn check(&self) -> Result<(), AnalysisError> {
        for (field, value) in [
            ("confidence.overall", self.overall),
            ("confidence.yoloDetection", self.detection_confidence),
            ("confidence.ocrAccuracy", self.extraction_confidence),
        ] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(AnalysisError::malformed(format!(
                    "{field} = {value} is outside [0, 100]"
                )));
            }
        }
        Ok(())
    }
}

impl IdentificationResult {
    /// Parse and validate a result payload.
    pub fn from_json(body: &str) -> Result<Self, AnalysisError> {
        let result: IdentificationResult =
            serde_json::from_str(body).map_err(|e| AnalysisError::malformed(e.to_string()))?;
        result.confidence.check()?;
        Ok(result)
    }
}
