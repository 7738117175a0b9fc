//! Canned identification service.
//!
//! Answers every submission with the same fabricated Paracetamol result after
//! a fixed delay. Failures and hangs can be scripted per phase. Compiled for
//! tests and behind the `fixtures` feature; never a production code path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::types::{Confidence, IdentificationResult, ModelsUsed};
use super::{IdentificationService, ScanId};
use crate::error::AnalysisError;
use crate::navigation::ImagePair;

/// Scripted behaviour of one phase.
#[derive(Debug, Clone)]
enum PhaseScript {
    Succeed,
    Fail(AnalysisError),
    Hang,
}

pub struct FixtureIdentificationService {
    delay: Duration,
    scan_id: ScanId,
    result: IdentificationResult,
    upload: PhaseScript,
    fetch: PhaseScript,
    submit_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    last_submitted: Mutex<Option<ImagePair>>,
}

impl Default for FixtureIdentificationService {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureIdentificationService {
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
            scan_id: ScanId::new("fixture-scan"),
            result: sample_result(),
            upload: PhaseScript::Succeed,
            fetch: PhaseScript::Succeed,
            submit_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            last_submitted: Mutex::new(None),
        }
    }

    /// Delay applied before each phase answers.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_result(mut self, result: IdentificationResult) -> Self {
        self.result = result;
        self
    }

    pub fn failing_upload(mut self, err: AnalysisError) -> Self {
        self.upload = PhaseScript::Fail(err);
        self
    }

    pub fn failing_fetch(mut self, err: AnalysisError) -> Self {
        self.fetch = PhaseScript::Fail(err);
        self
    }

    /// Upload never answers.
    pub fn hanging_upload(mut self) -> Self {
        self.upload = PhaseScript::Hang;
        self
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn last_submitted(&self) -> Option<ImagePair> {
        self.last_submitted
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    async fn play(&self, script: &PhaseScript) -> Result<(), AnalysisError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match script {
            PhaseScript::Succeed => Ok(()),
            PhaseScript::Fail(err) => Err(err.clone()),
            PhaseScript::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl IdentificationService for FixtureIdentificationService {
    async fn submit(&self, images: &ImagePair) -> Result<ScanId, AnalysisError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_submitted.lock() {
            *last = Some(images.clone());
        }
        self.play(&self.upload).await?;
        Ok(self.scan_id.clone())
    }

    async fn fetch_result(&self, scan_id: &ScanId) -> Result<IdentificationResult, AnalysisError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.play(&self.fetch).await?;
        if scan_id != &self.scan_id {
            return Err(AnalysisError::Fetch {
                status: 404,
                body: format!("unknown scan {scan_id}"),
            });
        }
        Ok(self.result.clone())
    }
}

/// The fabricated result the mocked analysis screen used to show.
pub fn sample_result() -> IdentificationResult {
    IdentificationResult {
        name: "Paracetamol".into(),
        dosage: "500mg".into(),
        manufacturer: "PharmaCorp Industries".into(),
        active_ingredient: "Acetaminophen".into(),
        uses: "Pain relief and fever reduction".into(),
        side_effects: "Nausea, rash, or allergic reactions (rare)".into(),
        confidence: Confidence {
            overall: 94.5,
            detection_confidence: 96.8,
            extraction_confidence: 92.3,
        },
        models: ModelsUsed {
            detection_model: "YOLOv8".into(),
            text_extraction_model: "Tesseract OCR".into(),
        },
        extracted_text: "PARACETAMOL 500MG PHARMACORP INDUSTRIES".into(),
    }
}
