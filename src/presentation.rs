//! View state for the review and results screens.
//!
//! Purely presentational. Nothing here touches the session; both views are
//! reset whenever their screen is entered.

use crate::identification::types::IdentificationResult;
use crate::navigation::ImageSide;

pub const ZOOM_STEP: f64 = 0.2;
pub const MIN_SCALE: f64 = 0.5;
pub const MAX_SCALE: f64 = 3.0;

/// Image review: which side is shown and at what zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewView {
    active_side: ImageSide,
    scale: f64,
}

impl Default for ReviewView {
    fn default() -> Self {
        Self {
            active_side: ImageSide::Front,
            scale: 1.0,
        }
    }
}

impl ReviewView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_side(&self) -> ImageSide {
        self.active_side
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.scale = round_scale((self.scale + ZOOM_STEP).min(MAX_SCALE));
        self.scale
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.scale = round_scale((self.scale - ZOOM_STEP).max(MIN_SCALE));
        self.scale
    }

    /// Switching sides resets the zoom.
    pub fn select_side(&mut self, side: ImageSide) {
        self.active_side = side;
        self.scale = 1.0;
    }

    pub fn can_zoom_in(&self) -> bool {
        self.scale < MAX_SCALE
    }

    pub fn can_zoom_out(&self) -> bool {
        self.scale > MIN_SCALE
    }

    /// Zoom as a whole percentage, e.g. `120%`.
    pub fn zoom_label(&self) -> String {
        format!("{:.0}%", self.scale * 100.0)
    }
}

// Keeps repeated steps from drifting (1.0 + 0.2 + 0.2 != 1.4 in f64).
fn round_scale(scale: f64) -> f64 {
    (scale * 10.0).round() / 10.0
}

/// Results screen: optional preview of the analyzed images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultView {
    show_image_preview: bool,
    preview_side: ImageSide,
}

impl Default for ResultView {
    fn default() -> Self {
        Self {
            show_image_preview: false,
            preview_side: ImageSide::Front,
        }
    }
}

impl ResultView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show_image_preview(&self) -> bool {
        self.show_image_preview
    }

    pub fn preview_side(&self) -> ImageSide {
        self.preview_side
    }

    pub fn open_preview(&mut self, side: ImageSide) {
        self.show_image_preview = true;
        self.preview_side = side;
    }

    pub fn close_preview(&mut self) {
        self.show_image_preview = false;
    }

    pub fn toggle_preview(&mut self) {
        self.show_image_preview = !self.show_image_preview;
    }

    pub fn select_preview_side(&mut self, side: ImageSide) {
        self.preview_side = side;
    }

    /// Labelled lines for the identification card.
    pub fn summary_lines(result: &IdentificationResult) -> Vec<(&'static str, String)> {
        let confidence = &result.confidence;
        vec![
            ("Name", result.name.clone()),
            ("Dosage", result.dosage.clone()),
            ("Manufacturer", result.manufacturer.clone()),
            ("Active Ingredient", result.active_ingredient.clone()),
            ("Uses", result.uses.clone()),
            ("Side Effects", result.side_effects.clone()),
            ("Overall Confidence", percent(confidence.overall)),
            ("Detection Confidence", percent(confidence.detection_confidence)),
            ("Text Extraction Accuracy", percent(confidence.extraction_confidence)),
            ("Detection Model", result.models.detection_model.clone()),
            ("Text Extraction Model", result.models.text_extraction_model.clone()),
            ("Extracted Text", result.extracted_text.clone()),
        ]
    }
}

fn percent(value: f64) -> String {
    format!("{value:.1}%")
}
