//! Analysis Orchestrator
//!
//! Drives one analysis attempt:
//!
//! 1. `AnalyzeRequested` moves the session to `Analyzing` before any network
//!    activity, so subscribers see the in-progress screen immediately.
//! 2. Upload both images, receive a scan identifier.
//! 3. Fetch the result for that identifier. Never started without one.
//! 4. Resolve to `ResultReady`, or to `AnalysisFailed` with a user-visible
//!    notice. The image pair in the session is never consumed.
//!
//! No retries. A failed attempt needs the user to ask again.

use std::sync::Arc;
use std::time::Duration;

use crate::error::AnalysisError;
use crate::identification::types::IdentificationResult;
use crate::identification::IdentificationService;
use crate::navigation::{
    ImagePair, NavEvent, NavigationError, NavigationStateMachine, Notice, Screen,
};

/// Message shown to the user when an attempt fails.
pub const ANALYSIS_FAILED_MESSAGE: &str = "Failed to analyze images. Please try again.";

/// How an attempt resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Identified(IdentificationResult),
    Failed(AnalysisError),
}

impl AnalysisOutcome {
    pub fn is_identified(&self) -> bool {
        matches!(self, AnalysisOutcome::Identified(_))
    }
}

#[derive(Clone)]
pub struct AnalysisOrchestrator {
    service: Arc<dyn IdentificationService>,
    timeout: Option<Duration>,
}

impl AnalysisOrchestrator {
    pub fn new(service: Arc<dyn IdentificationService>) -> Self {
        Self {
            service,
            timeout: None,
        }
    }

    /// Deadline for a whole attempt; expiry resolves as `AnalysisFailed`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run a full attempt against the session.
    ///
    /// Errors only when the session is not on `ImageReview`; every service
    /// failure is folded into [`AnalysisOutcome::Failed`].
    pub async fn analyze(
        &self,
        machine: &mut NavigationStateMachine,
    ) -> Result<AnalysisOutcome, NavigationError> {
        let pair = self.begin(machine)?;
        let outcome = match self.exchange(&pair).await {
            Ok(result) => AnalysisOutcome::Identified(result),
            Err(err) => AnalysisOutcome::Failed(err),
        };
        self.resolve(machine, outcome.clone())?;
        Ok(outcome)
    }

    /// Enter `Analyzing` and return the pair to submit.
    pub fn begin(&self, machine: &mut NavigationStateMachine) -> Result<ImagePair, NavigationError> {
        let pair = match machine.session().images() {
            Some(pair) => pair.clone(),
            None if machine.screen() != Screen::ImageReview => {
                return Err(NavigationError::IllegalTransition {
                    from: machine.screen(),
                    event: NavEvent::AnalyzeRequested.name(),
                })
            }
            None => return Err(NavigationError::IncompletePair { missing: "front" }),
        };
        machine.dispatch(NavEvent::AnalyzeRequested)?;
        Ok(pair)
    }

    /// The two-phase exchange, bounded by the configured deadline.
    pub async fn exchange(&self, pair: &ImagePair) -> Result<IdentificationResult, AnalysisError> {
        match self.timeout {
            Some(after) => tokio::time::timeout(after, self.two_phase(pair))
                .await
                .unwrap_or(Err(AnalysisError::TimedOut { after })),
            None => self.two_phase(pair).await,
        }
    }

    async fn two_phase(&self, pair: &ImagePair) -> Result<IdentificationResult, AnalysisError> {
        let scan_id = self.service.submit(pair).await?;
        tracing::debug!(scan_id = %scan_id, "submit phase complete");
        self.service.fetch_result(&scan_id).await
    }

    /// Apply the outcome to the session.
    pub fn resolve(
        &self,
        machine: &mut NavigationStateMachine,
        outcome: AnalysisOutcome,
    ) -> Result<(), NavigationError> {
        match outcome {
            AnalysisOutcome::Identified(result) => {
                tracing::info!(name = %result.name, confidence = result.confidence.overall, "medicine identified");
                machine.dispatch(NavEvent::ResultReady(result))?;
            }
            AnalysisOutcome::Failed(err) => {
                tracing::warn!(
                    error = %err,
                    contract_violation = err.is_contract_violation(),
                    "analysis failed"
                );
                let notice = Notice::new(ANALYSIS_FAILED_MESSAGE).with_detail(err.to_string());
                machine.dispatch(NavEvent::AnalysisFailed(notice))?;
            }
        }
        Ok(())
    }
}
