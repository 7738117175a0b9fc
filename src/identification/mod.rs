//! IdentificationService trait — the boundary to the external identification
//! backend. The orchestrator depends on this trait, never on a transport.

#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;
pub mod http;
pub mod types;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::navigation::ImagePair;
use types::IdentificationResult;

pub use http::HttpIdentificationClient;

/// Opaque token returned by the upload phase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanId(String);

impl ScanId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ScanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait IdentificationService: Send + Sync {
    /// Phase 1: submit both images, receive the scan identifier.
    async fn submit(&self, images: &ImagePair) -> Result<ScanId, AnalysisError>;

    /// Phase 2: retrieve the structured result for a submitted scan.
    async fn fetch_result(&self, scan_id: &ScanId) -> Result<IdentificationResult, AnalysisError>;
}
