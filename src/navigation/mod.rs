//! Screen Navigation State Machine
//!
//! Single owner of the [`Session`]. Child components never mutate it; they
//! hand a [`NavEvent`] to [`NavigationStateMachine::dispatch`], which applies
//! the transition and its side effects in one step before publishing a
//! [`SessionSnapshot`].
//!
//! ```text
//! Home ──scan──▶ ScanOptions ──pair complete──▶ ImageReview ──analyze──▶ Analyzing
//!  ▲                ▲   │ back                    │ back  ▲                │    │
//!  │                │   ▼                         ▼       └─analysis failed┘    │ result ready
//!  │                │  Home                  ScanOptions                        ▼
//!  └────back────────┴──────────── new scan / retake ───────────────────────── Results
//! ```

pub mod session;

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::identification::types::IdentificationResult;
pub use session::{ImagePair, ImageSide, Notice, Session, SessionSnapshot, SessionWatcher};

// ---------------------------------------------------------------------------
// Screens and events
// ---------------------------------------------------------------------------

/// The five screens. Exactly one is current; the machine has no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Screen {
    #[default]
    Home,
    ScanOptions,
    ImageReview,
    Analyzing,
    Results,
}

impl Screen {
    pub fn as_str(&self) -> &'static str {
        match self {
            Screen::Home => "home",
            Screen::ScanOptions => "scan-options",
            Screen::ImageReview => "image-review",
            Screen::Analyzing => "analyzing",
            Screen::Results => "results",
        }
    }

    /// Whether the back control is live on this screen. Analysis cannot be
    /// cancelled interactively.
    pub fn allows_back(&self) -> bool {
        matches!(
            self,
            Screen::ScanOptions | Screen::ImageReview | Screen::Results
        )
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events proposed to the state machine by the user or by components.
#[derive(Debug, Clone)]
pub enum NavEvent {
    ScanRequested,
    /// Both images captured; carries the completed pair.
    PairComplete(ImagePair),
    BackRequested,
    AnalyzeRequested,
    ResultReady(IdentificationResult),
    AnalysisFailed(Notice),
    NewScanRequested,
    RetakeRequested,
}

impl NavEvent {
    pub fn name(&self) -> &'static str {
        match self {
            NavEvent::ScanRequested => "scan_requested",
            NavEvent::PairComplete(_) => "pair_complete",
            NavEvent::BackRequested => "back_requested",
            NavEvent::AnalyzeRequested => "analyze_requested",
            NavEvent::ResultReady(_) => "result_ready",
            NavEvent::AnalysisFailed(_) => "analysis_failed",
            NavEvent::NewScanRequested => "new_scan_requested",
            NavEvent::RetakeRequested => "retake_requested",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    /// The event has no transition from the current screen. Session untouched.
    #[error("Event `{event}` is not allowed on screen `{from}`")]
    IllegalTransition { from: Screen, event: &'static str },

    /// `PairComplete` arrived with an empty slot.
    #[error("Image pair is incomplete: the {missing} image is missing")]
    IncompletePair { missing: &'static str },
}

/// Record of an applied transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: Screen,
    pub to: Screen,
    pub event: String,
    pub transitioned_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// Destination screen for an event, or `None` if the event is illegal there.
pub fn next_screen(from: Screen, event: &NavEvent) -> Option<Screen> {
    match (from, event) {
        (Screen::Home, NavEvent::ScanRequested) => Some(Screen::ScanOptions),

        (Screen::ScanOptions, NavEvent::PairComplete(_)) => Some(Screen::ImageReview),
        (Screen::ScanOptions, NavEvent::BackRequested) => Some(Screen::Home),

        (Screen::ImageReview, NavEvent::AnalyzeRequested) => Some(Screen::Analyzing),
        (Screen::ImageReview, NavEvent::BackRequested) => Some(Screen::ScanOptions),

        (Screen::Analyzing, NavEvent::ResultReady(_)) => Some(Screen::Results),
        (Screen::Analyzing, NavEvent::AnalysisFailed(_)) => Some(Screen::ImageReview),

        (Screen::Results, NavEvent::BackRequested) => Some(Screen::Home),
        (Screen::Results, NavEvent::NewScanRequested) => Some(Screen::ScanOptions),
        (Screen::Results, NavEvent::RetakeRequested) => Some(Screen::ScanOptions),

        _ => None,
    }
}

// ---------------------------------------------------------------------------
// NavigationStateMachine
// ---------------------------------------------------------------------------

/// Transitions kept in [`NavigationStateMachine::history`]; older ones are dropped.
pub const HISTORY_LIMIT: usize = 64;

/// Single-writer container for the session.
pub struct NavigationStateMachine {
    session: Session,
    history: VecDeque<StateTransition>,
    version: u64,
    sender: watch::Sender<SessionSnapshot>,
}

impl Default for NavigationStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationStateMachine {
    /// Start on `Home` with no images and no result.
    pub fn new() -> Self {
        let session = Session::new();
        let (sender, _rx) = watch::channel(SessionSnapshot::from_session(&session, 0));
        Self {
            session,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
            version: 0,
            sender,
        }
    }

    pub fn screen(&self) -> Screen {
        self.session.screen
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The most recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Subscribe to snapshots published after each applied transition.
    pub fn subscribe(&self) -> SessionWatcher {
        self.sender.subscribe()
    }

    /// Apply one event. The session is fully updated, clearing included,
    /// before the new screen becomes observable. On error nothing changes.
    pub fn dispatch(&mut self, event: NavEvent) -> Result<StateTransition, NavigationError> {
        let from = self.session.screen;
        let event_name = event.name();

        let Some(to) = next_screen(from, &event) else {
            tracing::warn!(from = %from, event = event_name, "ignoring illegal navigation event");
            return Err(NavigationError::IllegalTransition {
                from,
                event: event_name,
            });
        };

        if let NavEvent::PairComplete(pair) = &event {
            if let Some(side) = pair.open_slot() {
                return Err(NavigationError::IncompletePair {
                    missing: side.label(),
                });
            }
        }

        let session = &mut self.session;
        session.notice = None;

        match event {
            NavEvent::PairComplete(pair) => {
                session.images = Some(pair);
            }
            NavEvent::ResultReady(result) => {
                session.result = Some(result);
            }
            NavEvent::AnalysisFailed(notice) => {
                session.result = None;
                session.notice = Some(notice);
            }
            NavEvent::BackRequested if from == Screen::ImageReview => {
                session.images = None;
            }
            NavEvent::BackRequested | NavEvent::NewScanRequested | NavEvent::RetakeRequested
                if from == Screen::Results =>
            {
                session.images = None;
                session.result = None;
            }
            _ => {}
        }
        session.screen = to;

        let transition = StateTransition {
            from,
            to,
            event: event_name.to_string(),
            transitioned_at: Utc::now(),
        };
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(transition.clone());
        self.version += 1;
        self.sender
            .send_replace(SessionSnapshot::from_session(&self.session, self.version));

        tracing::debug!(from = %from, to = %to, event = event_name, "screen transition");
        Ok(transition)
    }
}
