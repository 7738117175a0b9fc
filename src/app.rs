//! Scan application root.
//!
//! [`ScanApp`] owns the navigation state machine, the acquisition controller
//! for the current `ScanOptions` visit, the analysis orchestrator, and the
//! local view state of the review and results screens. Screens hand it an
//! [`AppEvent`]; it routes the intent to the component that owns the affected
//! state and turns component signals into navigation events.

use std::sync::Arc;

use crate::analysis::{AnalysisOrchestrator, AnalysisOutcome};
use crate::capture::encoding::EncodedImage;
use crate::capture::{
    AcquisitionController, CaptureOutcome, CaptureSource, CaptureStep, RawCapture, StepBack,
};
use crate::config::ServiceConfig;
use crate::error::CaptureError;
use crate::identification::{HttpIdentificationClient, IdentificationService};
use crate::navigation::{
    ImageSide, NavEvent, NavigationError, NavigationStateMachine, Screen, Session, SessionWatcher,
};
use crate::presentation::{ResultView, ReviewView};

/// User intents, one per interactive control.
#[derive(Debug, Clone)]
pub enum AppEvent {
    StartScan,
    Capture {
        source: CaptureSource,
        raw: RawCapture,
    },
    Back,
    Analyze,
    NewScan,
    Retake,
    SelectReviewSide(ImageSide),
    ZoomIn,
    ZoomOut,
    OpenPreview(ImageSide),
    ClosePreview,
    SelectPreviewSide(ImageSide),
}

impl AppEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AppEvent::StartScan => "start_scan",
            AppEvent::Capture { .. } => "capture",
            AppEvent::Back => "back",
            AppEvent::Analyze => "analyze",
            AppEvent::NewScan => "new_scan",
            AppEvent::Retake => "retake",
            AppEvent::SelectReviewSide(_) => "select_review_side",
            AppEvent::ZoomIn => "zoom_in",
            AppEvent::ZoomOut => "zoom_out",
            AppEvent::OpenPreview(_) => "open_preview",
            AppEvent::ClosePreview => "close_preview",
            AppEvent::SelectPreviewSide(_) => "select_preview_side",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    /// The control does not exist on the current screen.
    #[error("`{event}` is not available on screen `{screen}`")]
    Unavailable { event: &'static str, screen: Screen },
}

pub struct ScanApp {
    navigation: NavigationStateMachine,
    acquisition: Option<AcquisitionController>,
    orchestrator: AnalysisOrchestrator,
    review: ReviewView,
    results: ResultView,
    last_outcome: Option<AnalysisOutcome>,
}

impl ScanApp {
    pub fn new(orchestrator: AnalysisOrchestrator) -> Self {
        Self {
            navigation: NavigationStateMachine::new(),
            acquisition: None,
            orchestrator,
            review: ReviewView::new(),
            results: ResultView::new(),
            last_outcome: None,
        }
    }

    pub fn with_service(service: Arc<dyn IdentificationService>) -> Self {
        Self::new(AnalysisOrchestrator::new(service))
    }

    /// Wire the HTTP identification client from configuration.
    pub fn from_config(config: ServiceConfig) -> anyhow::Result<Self> {
        let timeout = config.analysis_timeout;
        let client = HttpIdentificationClient::new(config)?;
        let orchestrator = AnalysisOrchestrator::new(Arc::new(client)).with_timeout(timeout);
        Ok(Self::new(orchestrator))
    }

    pub fn screen(&self) -> Screen {
        self.navigation.screen()
    }

    pub fn session(&self) -> &Session {
        self.navigation.session()
    }

    pub fn navigation(&self) -> &NavigationStateMachine {
        &self.navigation
    }

    pub fn subscribe(&self) -> SessionWatcher {
        self.navigation.subscribe()
    }

    /// Current capture step while on `ScanOptions`.
    pub fn capture_step(&self) -> Option<CaptureStep> {
        self.acquisition.as_ref().map(AcquisitionController::step)
    }

    pub fn review(&self) -> &ReviewView {
        &self.review
    }

    pub fn result_view(&self) -> &ResultView {
        &self.results
    }

    /// Outcome of the most recent analysis attempt.
    pub fn last_outcome(&self) -> Option<&AnalysisOutcome> {
        self.last_outcome.as_ref()
    }

    /// Image shown on the review screen.
    pub fn reviewed_image(&self) -> Option<&EncodedImage> {
        if self.screen() != Screen::ImageReview {
            return None;
        }
        self.session().images()?.get(self.review.active_side())
    }

    /// Image shown in the results preview, if open.
    pub fn preview_image(&self) -> Option<&EncodedImage> {
        if self.screen() != Screen::Results || !self.results.show_image_preview() {
            return None;
        }
        self.session().images()?.get(self.results.preview_side())
    }

    /// Handle one intent and return the screen it leaves the app on.
    pub async fn handle(&mut self, event: AppEvent) -> Result<Screen, AppError> {
        let screen = self.screen();
        let name = event.name();
        tracing::debug!(screen = %screen, event = name, "handling app event");

        match event {
            AppEvent::StartScan => self.navigate(NavEvent::ScanRequested)?,
            AppEvent::Capture { source, raw } => self.capture(source, &raw)?,
            AppEvent::Back => self.back()?,
            AppEvent::Analyze => self.analyze().await?,
            AppEvent::NewScan => self.navigate(NavEvent::NewScanRequested)?,
            AppEvent::Retake => self.navigate(NavEvent::RetakeRequested)?,
            AppEvent::SelectReviewSide(side) => {
                self.require(Screen::ImageReview, name)?;
                self.review.select_side(side);
            }
            AppEvent::ZoomIn => {
                self.require(Screen::ImageReview, name)?;
                self.review.zoom_in();
            }
            AppEvent::ZoomOut => {
                self.require(Screen::ImageReview, name)?;
                self.review.zoom_out();
            }
            AppEvent::OpenPreview(side) => {
                self.require(Screen::Results, name)?;
                self.results.open_preview(side);
            }
            AppEvent::ClosePreview => {
                self.require(Screen::Results, name)?;
                self.results.close_preview();
            }
            AppEvent::SelectPreviewSide(side) => {
                self.require(Screen::Results, name)?;
                self.results.select_preview_side(side);
            }
        }

        Ok(self.screen())
    }

    fn require(&self, screen: Screen, event: &'static str) -> Result<(), AppError> {
        if self.screen() == screen {
            Ok(())
        } else {
            Err(AppError::Unavailable {
                event,
                screen: self.screen(),
            })
        }
    }

    fn capture(&mut self, source: CaptureSource, raw: &RawCapture) -> Result<(), AppError> {
        let screen = self.screen();
        let Some(controller) = self.acquisition.as_mut() else {
            return Err(AppError::Unavailable {
                event: "capture",
                screen,
            });
        };

        match controller.capture(source, raw)? {
            CaptureOutcome::FrontCaptured => Ok(()),
            CaptureOutcome::PairComplete(pair) => {
                self.acquisition = None;
                self.navigate(NavEvent::PairComplete(pair))
            }
        }
    }

    fn back(&mut self) -> Result<(), AppError> {
        if let Some(controller) = self.acquisition.as_mut() {
            if controller.step_back() == StepBack::ReturnedToFront {
                return Ok(());
            }
        }
        self.navigate(NavEvent::BackRequested)
    }

    async fn analyze(&mut self) -> Result<(), AppError> {
        let outcome = self.orchestrator.analyze(&mut self.navigation).await?;
        let screen = self.screen();
        self.enter(screen);
        self.last_outcome = Some(outcome);
        Ok(())
    }

    fn navigate(&mut self, event: NavEvent) -> Result<(), AppError> {
        let transition = self.navigation.dispatch(event)?;
        self.enter(transition.to);
        Ok(())
    }

    /// Per-screen state is discarded on every screen change, entering or
    /// leaving.
    fn enter(&mut self, screen: Screen) {
        self.review = ReviewView::new();
        self.results = ResultView::new();
        self.acquisition = (screen == Screen::ScanOptions).then(AcquisitionController::new);
    }
}
