// Per-target replace state machine
//
// Idle -> Attempting -> {Succeeded, Failed}
// Attempting -> PendingConsent -> (Approved) -> Granted -> Attempting(retry) -> {Succeeded, Failed}

use crate::engine::consent::ConsentOutcome;
use crate::engine::core::{ConsentRequest, PermissionDenial, ReplacementOutcome};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceState {
    Idle,
    Attempting { retry: bool },
    PendingConsent(ConsentRequest),
    /// User approved; the next attempt is the single consent retry
    Granted(ConsentRequest),
    Succeeded,
    Failed(String),
}

/// What the caller should do after an attempt was recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStep {
    Done,
    NeedsConsent(ConsentRequest),
    Failed(ReplacementOutcome),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("operation is waiting for consent")]
    AwaitingConsent,

    #[error("operation already finished")]
    Finished,

    #[error("no attempt in progress")]
    NotAttempting,

    #[error("no consent requested")]
    NoPendingConsent,
}

#[derive(Debug, Clone)]
pub struct ReplaceSession {
    target: String,
    state: ReplaceState,
}

impl ReplaceSession {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            state: ReplaceState::Idle,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn state(&self) -> &ReplaceState {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, ReplaceState::Succeeded | ReplaceState::Failed(_))
    }

    pub fn is_ready_for_retry(&self) -> bool {
        matches!(self.state, ReplaceState::Granted(_))
    }

    /// Token of the prompt this session is waiting on, if any
    pub fn pending_token(&self) -> Option<&str> {
        match &self.state {
            ReplaceState::PendingConsent(req) => Some(&req.correlation_token),
            _ => None,
        }
    }

    pub fn begin_attempt(&mut self) -> Result<(), SessionError> {
        self.state = match &self.state {
            ReplaceState::Idle => ReplaceState::Attempting { retry: false },
            ReplaceState::Granted(_) => ReplaceState::Attempting { retry: true },
            ReplaceState::PendingConsent(_) => return Err(SessionError::AwaitingConsent),
            ReplaceState::Attempting { .. } => return Err(SessionError::NotAttempting),
            ReplaceState::Succeeded | ReplaceState::Failed(_) => return Err(SessionError::Finished),
        };
        Ok(())
    }

    /// Fold a writer outcome into the state machine
    pub fn record(&mut self, outcome: ReplacementOutcome) -> Result<SessionStep, SessionError> {
        let ReplaceState::Attempting { retry } = self.state else {
            return Err(SessionError::NotAttempting);
        };

        let step = match outcome {
            ReplacementOutcome::Success => {
                self.state = ReplaceState::Succeeded;
                SessionStep::Done
            }
            ReplacementOutcome::PermissionDenied(PermissionDenial::Recoverable(request))
                if !retry =>
            {
                self.state = ReplaceState::PendingConsent(request.clone());
                SessionStep::NeedsConsent(request)
            }
            ReplacementOutcome::PermissionDenied(PermissionDenial::Recoverable(_)) => {
                let reason = "write denied again after consent was granted".to_string();
                self.state = ReplaceState::Failed(reason.clone());
                SessionStep::Failed(ReplacementOutcome::PermissionDenied(
                    PermissionDenial::Terminal { reason },
                ))
            }
            other => {
                self.state = ReplaceState::Failed(describe(&other));
                SessionStep::Failed(other)
            }
        };
        Ok(step)
    }

    /// Apply the user's answer to a pending prompt
    pub fn on_consent(&mut self, outcome: ConsentOutcome) -> Result<(), SessionError> {
        let ReplaceState::PendingConsent(request) = &self.state else {
            return Err(SessionError::NoPendingConsent);
        };

        self.state = match outcome {
            ConsentOutcome::Approved => ReplaceState::Granted(request.clone()),
            ConsentOutcome::Denied => ReplaceState::Failed("user denied the grant".to_string()),
            ConsentOutcome::Dismissed => {
                ReplaceState::Failed("user dismissed the grant prompt".to_string())
            }
        };
        Ok(())
    }
}

fn describe(outcome: &ReplacementOutcome) -> String {
    match outcome {
        ReplacementOutcome::Success => "success".to_string(),
        ReplacementOutcome::PermissionDenied(PermissionDenial::Recoverable(_)) => {
            "consent required".to_string()
        }
        ReplacementOutcome::PermissionDenied(PermissionDenial::Terminal { reason }) => {
            reason.clone()
        }
        ReplacementOutcome::NotFound { what } => format!("{} not found", what),
        ReplacementOutcome::IoFailure { reason } => reason.clone(),
    }
}
