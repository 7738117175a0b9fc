//! medscan — medicine package scanner client.
//!
//! Guides a user through photographing the front and back of a medicine
//! package, submits the pair to an external identification service, and
//! holds the structured result for display.
//!
//! ```text
//! capture (front, back) ─▶ navigation ─▶ analysis ─▶ identification service
//!                              ▲                              │
//!                              └──────── result / failure ◀───┘
//! ```
//!
//! [`app::ScanApp`] wires the pieces behind a single intent API.

pub mod analysis;
pub mod app;
pub mod capture;
pub mod config;
pub mod error;
pub mod identification;
pub mod navigation;
pub mod presentation;
pub mod telemetry;

pub use analysis::{AnalysisOrchestrator, AnalysisOutcome};
pub use app::{AppError, AppEvent, ScanApp};
pub use capture::encoding::EncodedImage;
pub use capture::{AcquisitionController, CaptureOutcome, CaptureSource, CaptureStep, RawCapture};
pub use config::ServiceConfig;
pub use error::{AnalysisError, AnalysisPhase, CaptureError, ConfigError};
pub use identification::types::{Confidence, IdentificationResult, ModelsUsed};
pub use identification::{HttpIdentificationClient, IdentificationService, ScanId};
pub use navigation::{
    ImagePair, ImageSide, NavEvent, NavigationError, NavigationStateMachine, Notice, Screen,
    Session, SessionSnapshot, SessionWatcher, StateTransition,
};

pub use image::ImageFormat;
