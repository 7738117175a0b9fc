//! Session data owned by the navigation state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::Screen;
use crate::capture::encoding::EncodedImage;
use crate::error::CaptureError;
use crate::identification::types::IdentificationResult;

// ---------------------------------------------------------------------------
// ImagePair
// ---------------------------------------------------------------------------

/// One of the two labelled slots of an [`ImagePair`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSide {
    Front,
    Back,
}

impl ImageSide {
    pub fn label(&self) -> &'static str {
        match self {
            ImageSide::Front => "front",
            ImageSide::Back => "back",
        }
    }
}

/// Front and back images of one package.
///
/// Slots fill front first. `back` is never present while `front` is absent;
/// the fields are private so the ordering cannot be bypassed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImagePair {
    front: Option<EncodedImage>,
    back: Option<EncodedImage>,
}

impl ImagePair {
    /// An empty pair, both slots open.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A complete pair.
    pub fn new(front: EncodedImage, back: EncodedImage) -> Self {
        Self {
            front: Some(front),
            back: Some(back),
        }
    }

    pub fn front(&self) -> Option<&EncodedImage> {
        self.front.as_ref()
    }

    pub fn back(&self) -> Option<&EncodedImage> {
        self.back.as_ref()
    }

    pub fn get(&self, side: ImageSide) -> Option<&EncodedImage> {
        match side {
            ImageSide::Front => self.front(),
            ImageSide::Back => self.back(),
        }
    }

    /// The slot the next image will land in, or `None` once both are full.
    pub fn open_slot(&self) -> Option<ImageSide> {
        match (&self.front, &self.back) {
            (None, _) => Some(ImageSide::Front),
            (Some(_), None) => Some(ImageSide::Back),
            (Some(_), Some(_)) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.front.is_none() && self.back.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.front.is_some() && self.back.is_some()
    }

    /// Place an image in the open slot and report which one it filled.
    pub fn fill_next(&mut self, image: EncodedImage) -> Result<ImageSide, CaptureError> {
        let side = self.open_slot().ok_or(CaptureError::OutOfSequence)?;
        match side {
            ImageSide::Front => self.front = Some(image),
            ImageSide::Back => self.back = Some(image),
        }
        Ok(side)
    }

    /// Drop both slots. `back` goes first so the ordering holds at every step.
    pub fn clear(&mut self) {
        self.back = None;
        self.front = None;
    }
}

// ---------------------------------------------------------------------------
// Notice
// ---------------------------------------------------------------------------

/// A user-visible message attached to the session, e.g. after a failed
/// analysis. Cleared by the next applied transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
    /// Technical detail for diagnosis, not meant for the user.
    pub detail: Option<String>,
}

impl Notice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The full state tracked for one scan attempt: current screen, the captured
/// images and the identification result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub(super) screen: Screen,
    pub(super) images: Option<ImagePair>,
    pub(super) result: Option<IdentificationResult>,
    pub(super) notice: Option<Notice>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn images(&self) -> Option<&ImagePair> {
        self.images.as_ref()
    }

    pub fn result(&self) -> Option<&IdentificationResult> {
        self.result.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }
}

// ---------------------------------------------------------------------------
// Snapshots for subscribers
// ---------------------------------------------------------------------------

/// Lightweight view of the session published after every applied transition.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// Incremented on each applied transition
    pub version: u64,
    pub screen: Screen,
    pub has_images: bool,
    pub has_result: bool,
    /// Message of the current notice, if any
    pub notice: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn from_session(session: &Session, version: u64) -> Self {
        Self {
            version,
            screen: session.screen,
            has_images: session.images.is_some(),
            has_result: session.result.is_some(),
            notice: session.notice.as_ref().map(|n| n.message.clone()),
            updated_at: Utc::now(),
        }
    }
}

/// Receiver that yields a new snapshot on every applied transition.
pub type SessionWatcher = watch::Receiver<SessionSnapshot>;
