// cliprate-core/src/domain/flow.rs
//
// Screen sequence of the survey, as an explicit state machine instead of a
// mutable page string: every legal (page, event) pair is listed once in
// `transition`, everything else is rejected.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Welcome,
    Login,
    Consent,
    Questionnaire,
    PreFamiliarization,
    Familiarization,
    PostFamiliarization,
    VideoPlayer,
    Completion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Generic forward navigation (validated by the calling page).
    Next,
    /// Backward navigation, after any back-guard confirmation.
    Back,
    /// Login: first-time participant.
    NewUser,
    /// Login: returning participant with a verified id.
    ReturningUser,
    /// Video player: pool empty at entry or index walked past the end.
    RatingsExhausted,
}

/// Flags that bend the happy path.
#[derive(Debug, Clone, Copy)]
pub struct FlowContext {
    pub familiarization_enabled: bool,
}

impl Page {
    /// First rating-adjacent screen after intake.
    fn after_intake(ctx: FlowContext) -> Page {
        if ctx.familiarization_enabled {
            Page::PreFamiliarization
        } else {
            Page::VideoPlayer
        }
    }
}

/// The complete transition table. Terminal state is `Completion`; its only
/// exit is the explicit "back to questionnaire" escape hatch.
pub fn transition(page: Page, event: Event, ctx: FlowContext) -> Result<Page, DomainError> {
    use Event::*;
    use Page::*;

    let next = match (page, event) {
        (Welcome, Next) => Login,

        (Login, NewUser) => Consent,
        (Login, ReturningUser) => Page::after_intake(ctx),
        (Login, Back) => Welcome,

        (Consent, Next) => Questionnaire,
        (Consent, Back) => Login,

        (Questionnaire, Next) => Page::after_intake(ctx),
        (Questionnaire, Back) => Login,

        (PreFamiliarization, Next) => Familiarization,
        (PreFamiliarization, Back) => Questionnaire,

        (Familiarization, Next) => PostFamiliarization,
        (Familiarization, Back) => Questionnaire,

        (PostFamiliarization, Next) => VideoPlayer,

        (VideoPlayer, RatingsExhausted) => Completion,
        (VideoPlayer, Back) => Questionnaire,

        (Completion, Back) => Questionnaire,

        (page, event) => {
            return Err(DomainError::IllegalTransition {
                page: page.to_string(),
                event: format!("{:?}", event),
            })
        }
    };

    Ok(next)
}

/// Two-click confirmation for destructive back navigation: the first request
/// arms the guard (caller shows a warning), the second one confirms.
#[derive(Debug, Default, Clone, Copy)]
pub struct BackGuard {
    armed: bool,
}

impl BackGuard {
    /// Returns true once the guard is confirmed by a second request.
    pub fn request(&mut self) -> bool {
        if self.armed {
            self.armed = false;
            true
        } else {
            self.armed = true;
            false
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Any other interaction disarms the guard.
    pub fn reset(&mut self) {
        self.armed = false;
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Page::Welcome => "welcome",
            Page::Login => "login",
            Page::Consent => "consent",
            Page::Questionnaire => "questionnaire",
            Page::PreFamiliarization => "pre_familiarization",
            Page::Familiarization => "familiarization",
            Page::PostFamiliarization => "post_familiarization",
            Page::VideoPlayer => "videoplayer",
            Page::Completion => "completion",
        };
        write!(f, "{}", name)
    }
}
