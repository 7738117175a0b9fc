//! Typed error model for capture, analysis and configuration.
//!
//! ```text
//! capture   → Decode | OutOfSequence          (local to the acquisition controller)
//! upload    → Upload | Transport(Upload) | MissingIdentifier
//! fetch     → Fetch  | Transport(Fetch)  | MalformedResult
//! deadline  → TimedOut
//! ```
//!
//! Every analysis error is caught by the orchestrator and resolves to the
//! `AnalysisFailed` navigation event. Capture errors never touch navigation.

use std::path::PathBuf;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

/// Failures raised by the acquisition controller. The targeted slot is left
/// unchanged and the controller stays on the same step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    /// Raw capture input could not be read as an image.
    #[error("Capture input could not be decoded: {reason}")]
    Decode { reason: String },

    /// Capture invoked while both slots are already filled.
    #[error("Capture out of sequence: front and back images are already present")]
    OutOfSequence,
}

impl CaptureError {
    pub(crate) fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Which half of the two-phase exchange a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPhase {
    Upload,
    Fetch,
}

impl std::fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisPhase::Upload => f.write_str("upload"),
            AnalysisPhase::Fetch => f.write_str("fetch"),
        }
    }
}

/// Failures of one analysis attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    /// Upload endpoint answered with a non-success status.
    #[error("Upload failed with HTTP {status}: {body}")]
    Upload { status: u16, body: String },

    /// The request never produced an HTTP status (connect, TLS, body read).
    #[error("{phase} request failed: {message}")]
    Transport {
        phase: AnalysisPhase,
        message: String,
    },

    /// Upload succeeded but the response carried no scan identifier.
    #[error("Identification service did not return a scan identifier")]
    MissingIdentifier,

    /// Results endpoint answered with a non-success status.
    #[error("Result fetch failed with HTTP {status}: {body}")]
    Fetch { status: u16, body: String },

    /// Result payload does not match the identification result shape.
    #[error("Malformed identification result: {reason}")]
    MalformedResult { reason: String },

    /// The attempt exceeded the configured analysis deadline.
    #[error("Analysis timed out after {}s", .after.as_secs_f64())]
    TimedOut { after: Duration },
}

impl AnalysisError {
    /// Contract violations point at a defect in the identification service
    /// rather than at the network.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            AnalysisError::MissingIdentifier | AnalysisError::MalformedResult { .. }
        )
    }

    /// Phase the failure happened in. `None` for a deadline expiry, which can
    /// interrupt either phase.
    pub fn phase(&self) -> Option<AnalysisPhase> {
        match self {
            AnalysisError::Upload { .. } | AnalysisError::MissingIdentifier => {
                Some(AnalysisPhase::Upload)
            }
            AnalysisError::Fetch { .. } | AnalysisError::MalformedResult { .. } => {
                Some(AnalysisPhase::Fetch)
            }
            AnalysisError::Transport { phase, .. } => Some(*phase),
            AnalysisError::TimedOut { .. } => None,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResult {
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration value: {key}")]
    Missing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("Reading {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parsing {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
