//! Image Acquisition Controller
//!
//! Sequences the capture of a front image then a back image. Each capture
//! lands in the currently open slot; the controller reports completion exactly
//! once, synchronously, from the capture call that fills the back slot.

pub mod encoding;

use serde::{Deserialize, Serialize};

use crate::error::CaptureError;
use crate::navigation::{ImagePair, ImageSide};
use self::encoding::EncodedImage;

/// Where a capture came from. Both land in the same slot sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureSource {
    Camera,
    FileSelection,
}

/// Raw capture input handed over by the camera or the file picker.
#[derive(Debug, Clone)]
pub enum RawCapture {
    /// File content as read from disk or the camera buffer.
    Bytes(Vec<u8>),
    /// File content with the media type the file picker reported.
    File { bytes: Vec<u8>, media_type: String },
    /// An already encoded `data:` URL.
    DataUrl(String),
}

impl RawCapture {
    fn encode(&self) -> Result<EncodedImage, CaptureError> {
        match self {
            RawCapture::Bytes(bytes) => EncodedImage::from_bytes(bytes),
            RawCapture::File { bytes, media_type } => {
                EncodedImage::from_bytes_with_type(bytes, media_type)
            }
            RawCapture::DataUrl(url) => EncodedImage::from_data_url(url),
        }
    }
}

/// What the acquisition screen is currently asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStep {
    Front,
    Back,
    Complete,
}

impl CaptureStep {
    /// Screen title for the step.
    pub fn title(&self) -> &'static str {
        match self {
            CaptureStep::Front => "Scan Front Side",
            CaptureStep::Back => "Scan Back Side",
            CaptureStep::Complete => "Images Captured",
        }
    }
}

/// Result of a successful capture.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// Front stored; back is now targeted.
    FrontCaptured,
    /// Back stored. Fired once per acquisition session with the full pair.
    PairComplete(ImagePair),
}

/// Result of the acquisition screen's back control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepBack {
    /// Front image discarded; capturing the front again.
    ReturnedToFront,
    /// Nothing to undo; leave acquisition (navigation `BackRequested`).
    ExitAcquisition,
}

#[derive(Debug, Default)]
pub struct AcquisitionController {
    pair: ImagePair,
    completed: bool,
}

impl AcquisitionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> CaptureStep {
        match self.pair.open_slot() {
            Some(ImageSide::Front) => CaptureStep::Front,
            Some(ImageSide::Back) => CaptureStep::Back,
            None => CaptureStep::Complete,
        }
    }

    /// Images captured so far.
    pub fn pair(&self) -> &ImagePair {
        &self.pair
    }

    /// Encode `raw` and store it in the open slot.
    ///
    /// On a decode failure the slot is untouched and the step is unchanged.
    /// Once both slots are full every further call is `OutOfSequence`.
    pub fn capture(
        &mut self,
        source: CaptureSource,
        raw: &RawCapture,
    ) -> Result<CaptureOutcome, CaptureError> {
        if self.completed || self.pair.is_complete() {
            tracing::warn!(?source, "capture after both images were taken");
            return Err(CaptureError::OutOfSequence);
        }

        let image = raw.encode().inspect_err(|e| {
            tracing::debug!(?source, error = %e, "capture rejected");
        })?;
        let media_type = image.media_type().to_string();
        let dimensions = image.dimensions();
        let bytes = image.byte_len();
        let side = self.pair.fill_next(image)?;
        tracing::debug!(
            ?source,
            side = side.label(),
            %media_type,
            ?dimensions,
            bytes,
            "image captured"
        );

        match side {
            ImageSide::Front => Ok(CaptureOutcome::FrontCaptured),
            ImageSide::Back => {
                self.completed = true;
                Ok(CaptureOutcome::PairComplete(self.pair.clone()))
            }
        }
    }

    /// Undo the front capture while the back is targeted; otherwise ask the
    /// caller to leave acquisition.
    pub fn step_back(&mut self) -> StepBack {
        match self.step() {
            CaptureStep::Back => {
                self.pair.clear();
                tracing::debug!("front image discarded");
                StepBack::ReturnedToFront
            }
            CaptureStep::Front | CaptureStep::Complete => StepBack::ExitAcquisition,
        }
    }
}
